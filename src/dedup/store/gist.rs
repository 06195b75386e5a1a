// src/dedup/store/gist.rs
//! Processed set kept as one text file inside a GitHub Gist, one key per line.
//!
//! Bulk-listing backend: a read returns the whole set. A write is a fresh
//! read, a union and a full rewrite, so two overlapping writers can lose each
//! other's lines (last writer wins); that only widens the duplicate window.
//!
//! Older tracking files hold raw article urls instead of fingerprints. Such
//! lines are hashed on read and left untouched on rewrite.

use std::collections::BTreeSet;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use super::{http_client, ProcessedStore};
use crate::dedup::{fingerprint, Fingerprint, KnownSet};
use crate::error::{MarkError, StoreUnavailable};

pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
pub const DEFAULT_GIST_FILE: &str = "processed_urls.txt";

const BACKEND: &str = "gist";

#[derive(Debug, Deserialize)]
struct GistResp {
    #[serde(default)]
    files: HashMap<String, GistFile>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    raw_url: Option<String>,
}

pub struct GistStore {
    http: reqwest::Client,
    api_base: String,
    gist_id: String,
    file_name: String,
    token: String,
}

impl GistStore {
    pub fn new(
        api_base: &str,
        gist_id: impl Into<String>,
        file_name: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_base: api_base.trim_end_matches('/').to_string(),
            gist_id: gist_id.into(),
            file_name: file_name.into(),
            token: token.into(),
        })
    }

    fn gist_url(&self) -> String {
        format!("{}/gists/{}", self.api_base, self.gist_id)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// Raw lines of the tracking file. A gist without the file is empty.
    async fn read_lines(&self) -> Result<BTreeSet<String>> {
        let resp: GistResp = self
            .authed(self.http.get(self.gist_url()))
            .send()
            .await
            .context("gist get()")?
            .error_for_status()
            .context("gist get() status")?
            .json()
            .await
            .context("gist json")?;

        let Some(file) = resp.files.get(&self.file_name) else {
            tracing::info!(file = %self.file_name, "tracking file absent in gist; treating as empty");
            return Ok(BTreeSet::new());
        };

        let content = match (&file.content, file.truncated, &file.raw_url) {
            (_, true, Some(raw)) => self
                .authed(self.http.get(raw.as_str()))
                .send()
                .await
                .context("gist raw get()")?
                .error_for_status()
                .context("gist raw status")?
                .text()
                .await
                .context("gist raw text")?,
            (_, true, None) => return Err(anyhow!("gist file truncated and no raw_url given")),
            (Some(c), false, _) => c.clone(),
            (None, false, _) => String::new(),
        };

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// A stored fingerprint, or the fingerprint of a legacy raw-url line.
fn line_key(line: &str) -> Option<Fingerprint> {
    Fingerprint::from_hex(line).or_else(|| fingerprint(line).ok())
}

#[async_trait]
impl ProcessedStore for GistStore {
    async fn contains_batch(&self, _probe: &[Fingerprint]) -> KnownSet {
        match self.read_lines().await {
            Ok(lines) => {
                let set: KnownSet = lines.iter().filter_map(|l| line_key(l)).collect();
                tracing::debug!(lines = lines.len(), "gist processed set read");
                set
            }
            Err(e) => {
                let reason = format!("{e:#}");
                tracing::warn!(backend = BACKEND, error = %reason, "gist read failed");
                KnownSet::Unavailable(StoreUnavailable::new(BACKEND, reason))
            }
        }
    }

    async fn mark(&self, fingerprints: &[Fingerprint]) -> Result<(), MarkError> {
        if fingerprints.is_empty() {
            return Ok(());
        }
        let fail = |cause: anyhow::Error| MarkError {
            backend: BACKEND,
            total: fingerprints.len(),
            failed: fingerprints.len(),
            cause,
        };

        // Never rewrite from a failed read: it would wipe the set.
        let mut lines = self
            .read_lines()
            .await
            .context("refusing to rewrite gist after failed read")
            .map_err(fail)?;
        let present: HashSet<Fingerprint> = lines.iter().filter_map(|l| line_key(l)).collect();
        let added: Vec<String> = fingerprints
            .iter()
            .filter(|f| !present.contains(*f))
            .map(|f| f.to_string())
            .collect();
        if added.is_empty() {
            tracing::debug!("all fingerprints already present in gist");
            return Ok(());
        }
        let added_count = added.len();
        lines.extend(added);

        let content = lines.into_iter().collect::<Vec<_>>().join("\n");
        let mut files = serde_json::Map::new();
        files.insert(
            self.file_name.clone(),
            serde_json::json!({ "content": content }),
        );
        let payload = serde_json::json!({ "files": files });
        self.authed(self.http.patch(self.gist_url()))
            .json(&payload)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .context("gist patch()")
            .map_err(fail)?;

        tracing::info!(added = added_count, "gist processed set updated");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        BACKEND
    }
}
