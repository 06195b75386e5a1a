// src/announce/discord.rs
use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{compose_announcement, AnnouncementHandle, Announcer};
use crate::error::AnnouncementError;
use crate::publish::PublicationHandle;

/// Discord caps embed descriptions at 4096 chars; stay well below.
const DISCORD_LIMIT: usize = 2000;

#[derive(Clone)]
pub struct DiscordAnnouncer {
    webhook: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl DiscordAnnouncer {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    async fn post(&self, payload: &DiscordWebhookPayload) -> anyhow::Result<()> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(payload)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!("Discord webhook HTTP error: {e}"),
                },
                Err(e) => anyhow!("Discord webhook request failed: {e}"),
            };
            if attempt >= self.max_retries {
                return Err(err);
            }
            tracing::debug!(attempt, error = %err, "discord webhook retry");
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }
}

#[async_trait]
impl Announcer for DiscordAnnouncer {
    async fn announce(
        &self,
        text: &str,
        publication: &PublicationHandle,
    ) -> Result<AnnouncementHandle, AnnouncementError> {
        let description = compose_announcement(text, &publication.url, DISCORD_LIMIT);
        let payload = DiscordWebhookPayload::embed("New article", &description, &publication.url);
        self.post(&payload)
            .await
            .map_err(|e| AnnouncementError::new(self.channel(), e))?;
        tracing::info!(channel = "discord", "announcement posted");
        Ok(AnnouncementHandle {
            channel: self.channel(),
            url: None,
        })
    }

    fn channel(&self) -> &'static str {
        "discord"
    }
}

#[derive(Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
    url: String,
}

#[derive(Serialize)]
struct DiscordWebhookPayload {
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

impl DiscordWebhookPayload {
    fn embed(title: &str, description: &str, url: &str) -> Self {
        Self {
            content: None,
            embeds: vec![DiscordEmbed {
                title: title.to_string(),
                description: description.to_string(),
                url: url.to_string(),
            }],
        }
    }
}
