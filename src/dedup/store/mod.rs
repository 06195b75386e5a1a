// src/dedup/store/mod.rs
//! Processed-set store adapters.
//!
//! Every backend answers the same two questions ("which of these are done?",
//! "record these as done") over a remote set with weak consistency. Listing
//! backends return their whole content from `contains_batch`; per-key
//! backends answer for the probed fingerprints only.

pub mod blob;
pub mod bucket;
pub mod gist;
pub mod memory;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;

use crate::config::{DedupConfig, Secrets, StoreBackend};
use crate::dedup::{Fingerprint, KnownSet};
use crate::error::{MarkError, StoreUnavailable};

pub use blob::BlobStore;
pub use bucket::BucketStore;
pub use gist::GistStore;
pub use memory::MemoryStore;

#[async_trait]
pub trait ProcessedStore: Send + Sync {
    /// Known-processed fingerprints (best effort) or an explicit unavailable.
    async fn contains_batch(&self, probe: &[Fingerprint]) -> KnownSet;

    /// Idempotently add `fingerprints` to the processed set.
    async fn mark(&self, fingerprints: &[Fingerprint]) -> Result<(), MarkError>;

    fn backend(&self) -> &'static str;
}

/// Build the configured backend. Missing credentials are a config error.
pub fn build_store(cfg: &DedupConfig, secrets: &Secrets) -> Result<Arc<dyn ProcessedStore>> {
    let store: Arc<dyn ProcessedStore> = match cfg.backend {
        StoreBackend::Gist => {
            let gist_id = cfg
                .gist_id
                .clone()
                .ok_or_else(|| anyhow!("dedup.backend=gist requires dedup.gist_id / GIST_ID"))?;
            let token = secrets
                .github_token
                .clone()
                .ok_or_else(|| anyhow!("dedup.backend=gist requires GITHUB_TOKEN"))?;
            Arc::new(GistStore::new(
                &cfg.gist_api_base,
                gist_id,
                cfg.gist_file.clone(),
                token,
            )?)
        }
        StoreBackend::Bucket => {
            let bucket = cfg
                .bucket_name
                .clone()
                .ok_or_else(|| anyhow!("dedup.backend=bucket requires dedup.bucket_name"))?;
            Arc::new(BucketStore::new(
                &cfg.bucket_base_url,
                bucket,
                secrets.bucket_token.clone(),
            )?)
        }
        StoreBackend::Blob => {
            let site_id = secrets
                .blob_site_id
                .clone()
                .ok_or_else(|| anyhow!("dedup.backend=blob requires NETLIFY_SITE_ID"))?;
            let token = secrets
                .blob_token
                .clone()
                .ok_or_else(|| anyhow!("dedup.backend=blob requires NETLIFY_BLOBS_TOKEN"))?;
            Arc::new(BlobStore::new(
                &cfg.blob_base_url,
                site_id,
                cfg.blob_store_name.clone(),
                token,
            )?)
        }
        StoreBackend::Memory => {
            tracing::warn!("dedup.backend=memory: processed set is NOT persisted across restarts");
            Arc::new(MemoryStore::new())
        }
    };
    tracing::info!(backend = store.backend(), "processed-set store ready");
    Ok(store)
}

pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(crate::USER_AGENT)
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(10))
        .build()
        .context("building store http client")
}

/// Per-key presence check: 2xx present, 404 absent, anything else an error.
pub(crate) async fn key_exists(req: reqwest::RequestBuilder) -> Result<bool> {
    let resp = req.send().await.context("store key lookup")?;
    match resp.status() {
        s if s.is_success() => Ok(true),
        StatusCode::NOT_FOUND => Ok(false),
        s => Err(anyhow!("store key lookup returned {s}")),
    }
}

/// Probe each key in turn; the first failure makes the whole read unavailable.
pub(crate) async fn probe_each<F>(backend: &'static str, probe: &[Fingerprint], lookup: F) -> KnownSet
where
    F: Fn(&Fingerprint) -> reqwest::RequestBuilder,
{
    let mut known = HashSet::new();
    for fp in probe {
        match key_exists(lookup(fp)).await {
            Ok(true) => {
                known.insert(fp.clone());
            }
            Ok(false) => {}
            Err(e) => {
                let reason = format!("{e:#}");
                tracing::warn!(backend, fingerprint = %fp, error = %reason, "store read failed");
                return KnownSet::Unavailable(StoreUnavailable::new(backend, reason));
            }
        }
    }
    KnownSet::Available(known)
}

/// Write each key in turn, collecting failures into one `MarkError`.
pub(crate) async fn write_each<F>(backend: &'static str, fingerprints: &[Fingerprint], write: F) -> Result<(), MarkError>
where
    F: Fn(&Fingerprint) -> reqwest::RequestBuilder,
{
    let mut failures = Vec::new();
    for fp in fingerprints {
        let res = write(fp)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("writing key {fp}"));
        match res {
            Ok(_) => tracing::debug!(backend, fingerprint = %fp, "marked processed"),
            Err(e) => failures.push(e),
        }
    }
    match failures.len() {
        0 => Ok(()),
        failed => {
            let first = failures.remove(0);
            Err(MarkError {
                backend,
                total: fingerprints.len(),
                failed,
                cause: first,
            })
        }
    }
}

/// Timestamp stored as the value of per-key backends.
pub(crate) fn marker_value() -> String {
    chrono::Utc::now().to_rfc3339()
}
