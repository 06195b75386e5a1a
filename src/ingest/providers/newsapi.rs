// src/ingest/providers/newsapi.rs
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::FetchError;
use crate::ingest::types::{Article, FeedQuery, FeedSource};
use crate::ingest::{normalize_opt, normalize_text};

pub const DEFAULT_NEWSAPI_BASE: &str = "https://newsapi.org";

/// Placeholder NewsAPI returns for articles pulled by the publisher.
const REMOVED_MARKER: &str = "[Removed]";

#[derive(Debug, Deserialize)]
struct Resp {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    #[serde(default)]
    source: Option<RawSource>,
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    name: Option<String>,
}

/// NewsAPI `/v2/everything` client.
pub struct NewsApiSource {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NewsApiSource {
    pub fn new(api_key: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_base_url(api_key, DEFAULT_NEWSAPI_BASE)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .context("building newsapi http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn convert(raw: RawArticle) -> Option<Article> {
        let title = normalize_text(raw.title.as_deref().unwrap_or_default());
        if title.is_empty() || title == REMOVED_MARKER {
            return None;
        }
        Some(Article {
            title,
            description: normalize_opt(raw.description.as_deref()),
            body: normalize_opt(raw.content.as_deref()),
            url: raw
                .url
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
            source_name: raw
                .source
                .and_then(|s| s.name)
                .unwrap_or_else(|| "unknown".to_string()),
            published_at: raw
                .published_at
                .as_deref()
                .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }
}

#[async_trait]
impl FeedSource for NewsApiSource {
    async fn fetch(&self, query: &FeedQuery) -> Result<Vec<Article>, FetchError> {
        let mut params: Vec<(&str, String)> = vec![
            ("q", query.topic.clone()),
            ("language", query.language.clone()),
            ("sortBy", "publishedAt".to_string()),
            ("apiKey", self.api_key.clone()),
        ];
        if !query.sources.is_empty() {
            params.push(("sources", query.sources.join(",")));
        }

        let resp = self
            .http
            .get(format!("{}/v2/everything", self.base_url))
            .query(&params)
            .send()
            .await
            .context("newsapi get()")
            .map_err(FetchError::Transport)?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .context("newsapi .text()")
            .map_err(FetchError::Transport)?;

        // NewsAPI reports API-level problems in-band, often alongside a 4xx.
        let parsed: Option<Resp> = serde_json::from_str(&body).ok();
        match parsed {
            Some(r) if r.status != "ok" => Err(FetchError::Rejected {
                code: r.code.unwrap_or_else(|| status.as_u16().to_string()),
                message: r.message.unwrap_or_default(),
            }),
            Some(r) if status.is_success() => {
                let out: Vec<Article> = r
                    .articles
                    .into_iter()
                    .filter_map(Self::convert)
                    .take(query.max_count)
                    .collect();
                tracing::info!(provider = "newsapi", count = out.len(), "articles fetched");
                Ok(out)
            }
            _ => Err(FetchError::Transport(anyhow!(
                "newsapi returned {status} with an unreadable body"
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "newsapi"
    }
}
