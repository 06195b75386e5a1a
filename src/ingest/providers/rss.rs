use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::FetchError;
use crate::ingest::types::{Article, FeedQuery, FeedSource};
use crate::ingest::{normalize_opt, normalize_text};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(ts.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Any RSS 2.0 feed as a candidate source. Items are kept when they mention
/// at least one topic keyword (all items when the topic is blank).
pub struct RssSource {
    mode: Mode,
}

enum Mode {
    // Own copy so tests don't need 'static fixtures.
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl RssSource {
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        }
    }

    fn parse_items_from_str(s: &str, query: &FeedQuery) -> anyhow::Result<Vec<Article>> {
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;
        let channel_name = rss
            .channel
            .title
            .as_deref()
            .map(normalize_text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "rss".to_string());
        let keywords = topic_keywords(&query.topic);

        let mut out = Vec::new();
        for it in rss.channel.item {
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            if title.is_empty() {
                continue;
            }
            let description = normalize_opt(it.description.as_deref());
            if !mentions_any(&title, description.as_deref(), &keywords) {
                continue;
            }
            out.push(Article {
                title,
                description,
                body: None,
                url: it.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
                source_name: channel_name.clone(),
                published_at: it.pub_date.as_deref().and_then(parse_rfc2822),
            });
            if out.len() >= query.max_count {
                break;
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl FeedSource for RssSource {
    async fn fetch(&self, query: &FeedQuery) -> Result<Vec<Article>, FetchError> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(s, query).map_err(FetchError::Transport),
            Mode::Http { url, client } => {
                let body = client
                    .get(url.as_str())
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .context("rss http get()")
                    .map_err(FetchError::Transport)?
                    .text()
                    .await
                    .context("rss http .text()")
                    .map_err(FetchError::Transport)?;
                Self::parse_items_from_str(&body, query).map_err(FetchError::Transport)
            }
        }
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

fn topic_keywords(topic: &str) -> Vec<String> {
    topic
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(|w| w.to_lowercase())
        .collect()
}

fn mentions_any(title: &str, description: Option<&str>, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let hay = format!("{} {}", title, description.unwrap_or_default()).to_lowercase();
    keywords.iter().any(|k| hay.contains(k.as_str()))
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
