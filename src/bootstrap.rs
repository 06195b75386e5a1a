// src/bootstrap.rs
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::info;

use crate::announce::{Announcer, DiscordAnnouncer, TwitterAnnouncer};
use crate::config::{AnnounceChannel, FeedProvider, PipelineConfig, Secrets};
use crate::dedup::build_store;
use crate::ingest::providers::{NewsApiSource, RssSource};
use crate::ingest::FeedSource;
use crate::pipeline::Pipeline;
use crate::publish::GitHubPublisher;
use crate::render::HtmlRenderer;
use crate::synth::GeminiSynthesizer;

/// Wire the concrete collaborators named by `cfg`. Any credential a
/// configured collaborator needs must be present.
pub fn build_pipeline(cfg: &PipelineConfig, secrets: &Secrets) -> Result<Pipeline> {
    // Safe diagnostics only: which backends, never credential values
    info!(
        feed = ?cfg.feed.provider,
        dedup = ?cfg.dedup.backend,
        on_read_failure = ?cfg.dedup.on_read_failure,
        announce = ?cfg.announce.channel,
        "building pipeline"
    );

    let feed: Arc<dyn FeedSource> = match cfg.feed.provider {
        FeedProvider::Newsapi => {
            let key = required(&secrets.news_api_key, "NEWS_API_KEY")?;
            Arc::new(NewsApiSource::with_base_url(key, &cfg.feed.newsapi_base_url)?)
        }
        FeedProvider::Rss => {
            let url = cfg
                .feed
                .rss_url
                .clone()
                .ok_or_else(|| anyhow!("feed.provider=rss requires feed.rss_url"))?;
            Arc::new(RssSource::from_url(url))
        }
    };

    let store = build_store(&cfg.dedup, secrets)?;

    let synthesizer = Arc::new(GeminiSynthesizer::new(
        &cfg.synthesis.api_base,
        required(&secrets.gemini_api_key, "GEMINI_API_KEY")?,
        cfg.synthesis.model.clone(),
        cfg.synthesis.temperature,
    )?);

    let repo = cfg
        .publish
        .repo
        .clone()
        .ok_or_else(|| anyhow!("publish.repo / GITHUB_REPO_NAME is not set"))?;
    let publisher = Arc::new(GitHubPublisher::new(
        &cfg.publish.api_base,
        repo,
        required(&secrets.github_token, "GITHUB_TOKEN")?,
        cfg.publish.articles_dir.clone(),
        cfg.publish.branch_prefix.clone(),
    )?);

    let announcer: Option<Arc<dyn Announcer>> = match cfg.announce.channel {
        AnnounceChannel::None => None,
        AnnounceChannel::Twitter => Some(Arc::new(TwitterAnnouncer::new(
            &cfg.announce.twitter_api_base,
            required(&secrets.twitter_user_token, "TWITTER_USER_TOKEN")?,
        )?)),
        AnnounceChannel::Discord => Some(Arc::new(
            DiscordAnnouncer::new(required(&secrets.discord_webhook_url, "DISCORD_WEBHOOK_URL")?)
                .with_retries(cfg.announce.max_retries),
        )),
    };

    let mut pipeline = Pipeline::new(
        feed,
        store,
        synthesizer,
        Arc::new(HtmlRenderer::default()),
        publisher,
        cfg.feed.query(),
    )
    .with_read_policy(cfg.dedup.on_read_failure)
    .with_deadline(cfg.run.deadline());
    if let Some(a) = announcer {
        pipeline = pipeline.with_announcer(a);
    }
    Ok(pipeline)
}

fn required(v: &Option<String>, name: &str) -> Result<String> {
    v.clone().ok_or_else(|| anyhow!("missing required secret {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBackend;

    fn full_secrets() -> Secrets {
        Secrets {
            news_api_key: Some("n".into()),
            gemini_api_key: Some("g".into()),
            github_token: Some("t".into()),
            ..Default::default()
        }
    }

    fn memory_cfg() -> PipelineConfig {
        let mut cfg = PipelineConfig::default();
        cfg.dedup.backend = StoreBackend::Memory;
        cfg.publish.repo = Some("me/site".into());
        cfg
    }

    #[test]
    fn builds_with_all_required_secrets() {
        assert!(build_pipeline(&memory_cfg(), &full_secrets()).is_ok());
    }

    #[test]
    fn missing_secret_is_named_in_the_error() {
        let mut s = full_secrets();
        s.gemini_api_key = None;
        let err = build_pipeline(&memory_cfg(), &s).err().unwrap();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn configured_announcer_needs_its_credential() {
        let mut cfg = memory_cfg();
        cfg.announce.channel = AnnounceChannel::Discord;
        let err = build_pipeline(&cfg, &full_secrets()).err().unwrap();
        assert!(err.to_string().contains("DISCORD_WEBHOOK_URL"));
    }
}
