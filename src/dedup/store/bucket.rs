// src/dedup/store/bucket.rs
//! Public key bucket (kvdb-style): `GET /{bucket}/{key}` to probe,
//! `POST /{bucket}/{key}` to record. Writing an existing key overwrites its
//! value, so retries are harmless.

use anyhow::Result;
use async_trait::async_trait;

use super::{http_client, marker_value, probe_each, write_each, ProcessedStore};
use crate::dedup::{Fingerprint, KnownSet};
use crate::error::MarkError;

pub const DEFAULT_BUCKET_BASE: &str = "https://kvdb.io";

const BACKEND: &str = "bucket";

pub struct BucketStore {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    token: Option<String>,
}

impl BucketStore {
    pub fn new(base_url: &str, bucket: impl Into<String>, token: Option<String>) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            token,
        })
    }

    fn key_url(&self, fp: &Fingerprint) -> String {
        format!("{}/{}/{}", self.base_url, self.bucket, fp)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }
}

#[async_trait]
impl ProcessedStore for BucketStore {
    async fn contains_batch(&self, probe: &[Fingerprint]) -> KnownSet {
        probe_each(BACKEND, probe, |fp| self.authed(self.http.get(self.key_url(fp)))).await
    }

    async fn mark(&self, fingerprints: &[Fingerprint]) -> Result<(), MarkError> {
        let value = marker_value();
        write_each(BACKEND, fingerprints, |fp| {
            self.authed(self.http.post(self.key_url(fp)))
                .body(value.clone())
        })
        .await
    }

    fn backend(&self) -> &'static str {
        BACKEND
    }
}
