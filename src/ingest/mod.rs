// src/ingest/mod.rs
pub mod providers;
pub mod types;

use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

pub use types::{Article, FeedQuery, FeedSource};

/// Max chars kept per text field handed downstream.
const MAX_FIELD_CHARS: usize = 4000;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_articles_total", "Articles returned by feed sources.");
        describe_counter!(
            "ingest_provider_errors_total",
            "Feed fetch/parse errors."
        );
        describe_histogram!("ingest_fetch_ms", "Feed fetch time in milliseconds.");
    });
}

/// Normalize feed text: decode entities, strip tags, drop NewsAPI's
/// "[+123 chars]" truncation marker, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Truncation marker
    static RE_TRUNC: OnceCell<regex::Regex> = OnceCell::new();
    let re_trunc =
        RE_TRUNC.get_or_init(|| regex::Regex::new(r"\s*(…|\.\.\.)?\s*\[\+\d+ chars\]\s*$").unwrap());
    out = re_trunc.replace(&out, "").to_string();

    // 4) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 5) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > MAX_FIELD_CHARS {
        out = out.chars().take(MAX_FIELD_CHARS).collect();
    }
    out
}

/// `normalize_text` for optional fields; blank results become `None`.
pub fn normalize_opt(s: Option<&str>) -> Option<String> {
    s.map(normalize_text).filter(|t| !t.is_empty())
}

/// Fetch once from `source`, recording feed telemetry.
pub async fn fetch_candidates(
    source: &dyn FeedSource,
    query: &FeedQuery,
) -> Result<Vec<Article>, crate::error::FetchError> {
    ensure_metrics_described();
    let t0 = std::time::Instant::now();
    let res = source.fetch(query).await;
    metrics::histogram!("ingest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

    match &res {
        Ok(articles) => {
            counter!("ingest_articles_total").increment(articles.len() as u64);
            tracing::debug!(provider = source.name(), count = articles.len(), "feed fetched");
        }
        Err(e) => {
            counter!("ingest_provider_errors_total").increment(1);
            tracing::warn!(provider = source.name(), error = %e, "feed fetch failed");
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_collapses_ws_and_strips_tags() {
        let s = "  <b>Hello,</b>&nbsp;&nbsp; world  ";
        assert_eq!(normalize_text(s), "Hello, world");
    }

    #[test]
    fn normalize_text_drops_newsapi_truncation_marker() {
        let s = "Chipmakers rallied on Tuesday after… [+2817 chars]";
        assert_eq!(normalize_text(s), "Chipmakers rallied on Tuesday after");
    }

    #[test]
    fn normalize_opt_maps_blank_to_none() {
        assert_eq!(normalize_opt(Some("  <p></p> ")), None);
        assert_eq!(normalize_opt(None), None);
        assert_eq!(normalize_opt(Some("x")), Some("x".to_string()));
    }
}
