// src/config/secrets.rs
use std::fmt;

use super::env_nonempty;

/// Credentials read from the environment. `Debug` prints lengths only.
#[derive(Clone, Default)]
pub struct Secrets {
    pub news_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub github_token: Option<String>,
    pub bucket_token: Option<String>,
    pub blob_token: Option<String>,
    pub blob_site_id: Option<String>,
    pub twitter_user_token: Option<String>,
    pub discord_webhook_url: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            news_api_key: env_nonempty("NEWS_API_KEY"),
            gemini_api_key: env_nonempty("GEMINI_API_KEY"),
            github_token: env_nonempty("GITHUB_TOKEN").or_else(|| env_nonempty("AURORE_GITHUB_TOKEN")),
            bucket_token: env_nonempty("KV_BUCKET_TOKEN"),
            blob_token: env_nonempty("NETLIFY_BLOBS_TOKEN"),
            blob_site_id: env_nonempty("NETLIFY_SITE_ID"),
            twitter_user_token: env_nonempty("TWITTER_USER_TOKEN"),
            discord_webhook_url: env_nonempty("DISCORD_WEBHOOK_URL"),
        }
    }
}

fn redact(v: &Option<String>) -> String {
    match v {
        Some(s) => format!("<set, len={}>", s.len()),
        None => "<unset>".to_string(),
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("news_api_key", &redact(&self.news_api_key))
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("github_token", &redact(&self.github_token))
            .field("bucket_token", &redact(&self.bucket_token))
            .field("blob_token", &redact(&self.blob_token))
            .field("blob_site_id", &redact(&self.blob_site_id))
            .field("twitter_user_token", &redact(&self.twitter_user_token))
            .field("discord_webhook_url", &redact(&self.discord_webhook_url))
            .finish()
    }
}
