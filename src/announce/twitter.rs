// src/announce/twitter.rs
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{compose_announcement, AnnouncementHandle, Announcer};
use crate::error::AnnouncementError;
use crate::publish::PublicationHandle;

pub const DEFAULT_TWITTER_API: &str = "https://api.twitter.com";
pub const TWEET_LIMIT: usize = 280;

/// X/Twitter v2 poster using an OAuth2 user-context bearer token.
pub struct TwitterAnnouncer {
    http: reqwest::Client,
    api_base: String,
    user_token: String,
}

#[derive(Serialize)]
struct TweetReq<'a> {
    text: &'a str,
}
#[derive(Deserialize)]
struct TweetResp {
    data: TweetData,
}
#[derive(Deserialize)]
struct TweetData {
    id: String,
}

impl TwitterAnnouncer {
    pub fn new(api_base: &str, user_token: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .context("building twitter http client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            user_token: user_token.into(),
        })
    }

    async fn post(&self, text: &str) -> anyhow::Result<String> {
        let resp = self
            .http
            .post(format!("{}/2/tweets", self.api_base))
            .bearer_auth(&self.user_token)
            .json(&TweetReq { text })
            .send()
            .await
            .context("tweet post()")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!(
                "twitter returned {status}: {}",
                body.chars().take(200).collect::<String>()
            ));
        }
        let body: TweetResp = resp.json().await.context("tweet json")?;
        Ok(body.data.id)
    }
}

#[async_trait]
impl Announcer for TwitterAnnouncer {
    async fn announce(
        &self,
        text: &str,
        publication: &PublicationHandle,
    ) -> Result<AnnouncementHandle, AnnouncementError> {
        let message = compose_announcement(text, &publication.url, TWEET_LIMIT);
        let id = self
            .post(&message)
            .await
            .map_err(|e| AnnouncementError::new(self.channel(), e))?;
        tracing::info!(channel = "twitter", tweet_id = %id, "announcement posted");
        Ok(AnnouncementHandle {
            channel: self.channel(),
            url: Some(format!("https://x.com/i/web/status/{id}")),
        })
    }

    fn channel(&self) -> &'static str {
        "twitter"
    }
}
