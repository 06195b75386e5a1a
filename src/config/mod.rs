// src/config/mod.rs
//! Pipeline configuration.
//!
//! Non-secret settings come from TOML (`$PIPELINE_CONFIG_PATH`, then
//! `config/pipeline.toml`, then built-in defaults) with a few env overrides.
//! Credentials only ever come from the environment, see [`secrets`].

pub mod secrets;

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::dedup::store::blob::{DEFAULT_BLOB_BASE, DEFAULT_BLOB_STORE};
use crate::dedup::store::bucket::DEFAULT_BUCKET_BASE;
use crate::dedup::store::gist::{DEFAULT_GIST_FILE, DEFAULT_GITHUB_API};
use crate::dedup::DedupReadPolicy;
use crate::ingest::providers::newsapi::DEFAULT_NEWSAPI_BASE;
use crate::ingest::FeedQuery;

pub use secrets::Secrets;

pub const ENV_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

/// NewsAPI caps page size at 100.
const MAX_ARTICLES_CAP: usize = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub feed: FeedConfig,
    pub dedup: DedupConfig,
    pub synthesis: SynthesisConfig,
    pub publish: PublishConfig,
    pub announce: AnnounceConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedProvider {
    #[default]
    Newsapi,
    Rss,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedConfig {
    pub provider: FeedProvider,
    pub topic: String,
    pub sources: Vec<String>,
    pub language: String,
    pub max_articles: usize,
    pub newsapi_base_url: String,
    pub rss_url: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            provider: FeedProvider::Newsapi,
            topic: "technology trends 2025".to_string(),
            sources: vec!["reuters".to_string(), "bbc-news".to_string()],
            language: "en".to_string(),
            max_articles: 3,
            newsapi_base_url: DEFAULT_NEWSAPI_BASE.to_string(),
            rss_url: None,
        }
    }
}

impl FeedConfig {
    pub fn query(&self) -> FeedQuery {
        FeedQuery {
            topic: self.topic.clone(),
            sources: self.sources.clone(),
            language: self.language.clone(),
            max_count: self.max_articles,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Gist,
    Bucket,
    Blob,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gist" => Ok(Self::Gist),
            "bucket" => Ok(Self::Bucket),
            "blob" => Ok(Self::Blob),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow!("unknown dedup backend `{other}`")),
        }
    }
}

impl FromStr for DedupReadPolicy {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "skip_run" => Ok(Self::SkipRun),
            "process_all" => Ok(Self::ProcessAll),
            other => Err(anyhow!("unknown dedup read policy `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DedupConfig {
    pub backend: StoreBackend,
    pub on_read_failure: DedupReadPolicy,
    pub gist_id: Option<String>,
    pub gist_file: String,
    pub gist_api_base: String,
    pub bucket_base_url: String,
    pub bucket_name: Option<String>,
    pub blob_base_url: String,
    pub blob_store_name: String,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Gist,
            on_read_failure: DedupReadPolicy::SkipRun,
            gist_id: None,
            gist_file: DEFAULT_GIST_FILE.to_string(),
            gist_api_base: DEFAULT_GITHUB_API.to_string(),
            bucket_base_url: DEFAULT_BUCKET_BASE.to_string(),
            bucket_name: None,
            blob_base_url: DEFAULT_BLOB_BASE.to_string(),
            blob_store_name: DEFAULT_BLOB_STORE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesisConfig {
    pub model: String,
    pub temperature: f32,
    pub api_base: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.4,
            api_base: crate::synth::gemini::DEFAULT_GEMINI_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PublishConfig {
    /// "owner/name"
    pub repo: Option<String>,
    pub api_base: String,
    pub articles_dir: String,
    pub branch_prefix: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            repo: None,
            api_base: DEFAULT_GITHUB_API.to_string(),
            articles_dir: "articles".to_string(),
            branch_prefix: "aurore/article-".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnnounceChannel {
    #[default]
    None,
    Twitter,
    Discord,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnnounceConfig {
    pub channel: AnnounceChannel,
    pub twitter_api_base: String,
    pub max_retries: u8,
}

impl Default for AnnounceConfig {
    fn default() -> Self {
        Self {
            channel: AnnounceChannel::None,
            twitter_api_base: crate::announce::twitter::DEFAULT_TWITTER_API.to_string(),
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    /// Hard deadline for one run; expiry fails the run at the current stage.
    pub timeout_secs: u64,
    /// In-process schedule; 0 disables it (external cron / POST /run only).
    pub schedule_interval_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 25,
            schedule_interval_secs: 0,
        }
    }
}

impl RunConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl PipelineConfig {
    /// Load from an explicit TOML file (no env overrides).
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        let cfg: PipelineConfig = toml::from_str(&content)
            .with_context(|| format!("parsing pipeline config {}", path.display()))?;
        cfg.validated()
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $PIPELINE_CONFIG_PATH
    /// 2) config/pipeline.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_CONFIG_PATH} points to non-existent path");
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Self::default()
            }
        };
        base.with_env_overrides()?.validated()
    }

    fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(v) = env_nonempty("PIPELINE_TOPIC") {
            self.feed.topic = v;
        }
        if let Some(v) = env_nonempty("GITHUB_REPO_NAME") {
            self.publish.repo = Some(v);
        }
        if let Some(v) = env_nonempty("GIST_ID") {
            self.dedup.gist_id = Some(v);
        }
        if let Some(v) = env_nonempty("DEDUP_BACKEND") {
            self.dedup.backend = v.parse()?;
        }
        if let Some(v) = env_nonempty("DEDUP_ON_READ_FAILURE") {
            self.dedup.on_read_failure = v.parse()?;
        }
        if let Some(v) = env_nonempty("PIPELINE_TIMEOUT_SECS") {
            self.run.timeout_secs = v
                .parse()
                .with_context(|| format!("PIPELINE_TIMEOUT_SECS={v}"))?;
        }
        if let Some(v) = env_nonempty("PIPELINE_SCHEDULE_SECS") {
            self.run.schedule_interval_secs = v
                .parse()
                .with_context(|| format!("PIPELINE_SCHEDULE_SECS={v}"))?;
        }
        Ok(self)
    }

    fn validated(mut self) -> Result<Self> {
        if self.feed.max_articles == 0 {
            bail!("feed.max_articles must be at least 1");
        }
        self.feed.max_articles = self.feed.max_articles.min(MAX_ARTICLES_CAP);
        if self.run.timeout_secs == 0 {
            bail!("run.timeout_secs must be positive");
        }
        if self.feed.provider == FeedProvider::Rss && self.feed.rss_url.is_none() {
            bail!("feed.provider=rss requires feed.rss_url");
        }
        if !(0.0..=2.0).contains(&self.synthesis.temperature) {
            self.synthesis.temperature = SynthesisConfig::default().temperature;
        }
        Ok(self)
    }
}

pub(crate) fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: PipelineConfig = toml::from_str(
            r#"
[feed]
topic = "climate"
max_articles = 5

[dedup]
backend = "bucket"
bucket_name = "abc123"
on_read_failure = "process_all"
"#,
        )
        .unwrap();
        assert_eq!(cfg.feed.topic, "climate");
        assert_eq!(cfg.feed.language, "en");
        assert_eq!(cfg.dedup.backend, StoreBackend::Bucket);
        assert_eq!(cfg.dedup.on_read_failure, DedupReadPolicy::ProcessAll);
        assert_eq!(cfg.dedup.gist_file, DEFAULT_GIST_FILE);
        assert_eq!(cfg.run.timeout_secs, 25);
    }

    #[test]
    fn validation_rejects_zero_articles_and_caps_large_batches() {
        let mut cfg = PipelineConfig::default();
        cfg.feed.max_articles = 0;
        assert!(cfg.clone().validated().is_err());
        cfg.feed.max_articles = 500;
        assert_eq!(cfg.validated().unwrap().feed.max_articles, 100);
    }

    #[test]
    fn backend_and_policy_parse_from_env_strings() {
        assert_eq!("MEMORY".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("redis".parse::<StoreBackend>().is_err());
        assert_eq!(
            "process-all".parse::<DedupReadPolicy>().unwrap(),
            DedupReadPolicy::ProcessAll
        );
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD so the repo's own config/ doesn't leak in
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        for k in [
            ENV_CONFIG_PATH,
            "PIPELINE_TOPIC",
            "GITHUB_REPO_NAME",
            "GIST_ID",
            "DEDUP_BACKEND",
            "DEDUP_ON_READ_FAILURE",
            "PIPELINE_TIMEOUT_SECS",
            "PIPELINE_SCHEDULE_SECS",
        ] {
            env::remove_var(k);
        }

        // No files → defaults
        let v = PipelineConfig::load_default().unwrap();
        assert_eq!(v, PipelineConfig::default());

        // Env path wins, env overrides apply on top
        let p = tmp.path().join("custom.toml");
        fs::write(&p, "[feed]\ntopic = \"space\"\n").unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        env::set_var("DEDUP_BACKEND", "memory");
        let v2 = PipelineConfig::load_default().unwrap();
        assert_eq!(v2.feed.topic, "space");
        assert_eq!(v2.dedup.backend, StoreBackend::Memory);

        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var("DEDUP_BACKEND");
        env::set_current_dir(&old).unwrap();
    }
}
