// src/ingest/types.rs
use chrono::{DateTime, Utc};

use crate::dedup::fingerprint::{fingerprint, Fingerprint};
use crate::error::FetchError;

/// A candidate article as returned by a feed. Immutable once fetched.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub description: Option<String>,
    pub body: Option<String>,
    pub url: Option<String>, // identity; None/empty => cannot be deduplicated
    pub source_name: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl Article {
    /// Dedup key for this article, `None` when the url is missing or blank.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.url.as_deref().and_then(|u| fingerprint(u).ok())
    }

    /// Text handed to the synthesizer: body, falling back to description.
    pub fn best_text(&self) -> &str {
        self.body
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .or(self.description.as_deref())
            .unwrap_or_default()
    }
}

/// What to ask the feed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub topic: String,
    pub sources: Vec<String>,
    pub language: String,
    pub max_count: usize,
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// At most `query.max_count` articles, newest first.
    async fn fetch(&self, query: &FeedQuery) -> Result<Vec<Article>, FetchError>;
    fn name(&self) -> &'static str;
}
