// src/dedup/store/blob.rs
//! Managed blob store (Netlify Blobs API): one blob per fingerprint under
//! `{base}/{site_id}/{store}/{key}`, bearer-authenticated. Keys are never
//! listed; lookups are per key.

use anyhow::Result;
use async_trait::async_trait;

use super::{http_client, marker_value, probe_each, write_each, ProcessedStore};
use crate::dedup::{Fingerprint, KnownSet};
use crate::error::MarkError;

pub const DEFAULT_BLOB_BASE: &str = "https://api.netlify.com/api/v1/blobs";
pub const DEFAULT_BLOB_STORE: &str = "processed_articles_v1";

const BACKEND: &str = "blob";

pub struct BlobStore {
    http: reqwest::Client,
    base_url: String,
    site_id: String,
    store_name: String,
    token: String,
}

impl BlobStore {
    pub fn new(
        base_url: &str,
        site_id: impl Into<String>,
        store_name: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            site_id: site_id.into(),
            store_name: store_name.into(),
            token: token.into(),
        })
    }

    fn key_url(&self, fp: &Fingerprint) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url, self.site_id, self.store_name, fp
        )
    }
}

#[async_trait]
impl ProcessedStore for BlobStore {
    async fn contains_batch(&self, probe: &[Fingerprint]) -> KnownSet {
        probe_each(BACKEND, probe, |fp| {
            self.http.get(self.key_url(fp)).bearer_auth(&self.token)
        })
        .await
    }

    async fn mark(&self, fingerprints: &[Fingerprint]) -> Result<(), MarkError> {
        let value = marker_value();
        write_each(BACKEND, fingerprints, |fp| {
            self.http
                .put(self.key_url(fp))
                .bearer_auth(&self.token)
                .body(value.clone())
        })
        .await
    }

    fn backend(&self) -> &'static str {
        BACKEND
    }
}
