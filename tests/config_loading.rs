// tests/config_loading.rs
use std::fs;
use std::path::Path;

use aurore_pipeline::config::{AnnounceChannel, FeedProvider, PipelineConfig, StoreBackend};
use aurore_pipeline::dedup::DedupReadPolicy;

#[test]
fn shipped_sample_config_parses_to_the_defaults() {
    let cfg = PipelineConfig::load_from(Path::new("config/pipeline.toml")).expect("sample config");
    assert_eq!(cfg.feed.provider, FeedProvider::Newsapi);
    assert_eq!(cfg.feed.max_articles, 3);
    assert_eq!(cfg.dedup.backend, StoreBackend::Gist);
    assert_eq!(cfg.dedup.on_read_failure, DedupReadPolicy::SkipRun);
    assert_eq!(cfg.announce.channel, AnnounceChannel::None);
    assert_eq!(cfg.run.timeout_secs, 25);
}

#[test]
fn rss_without_url_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("p.toml");
    fs::write(&p, "[feed]\nprovider = \"rss\"\n").unwrap();
    let err = PipelineConfig::load_from(&p).unwrap_err();
    assert!(format!("{err:#}").contains("rss_url"));
}

#[test]
fn unknown_backend_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("p.toml");
    fs::write(&p, "[dedup]\nbackend = \"redis\"\n").unwrap();
    assert!(PipelineConfig::load_from(&p).is_err());
}
