// src/dedup/mod.rs
//! Deduplication core: fingerprints, the processed-set store adapters and the
//! filter that narrows a feed batch to never-seen articles.

pub mod fingerprint;
pub mod store;

use std::collections::HashSet;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::error::StoreUnavailable;
use crate::ingest::Article;

pub use fingerprint::{fingerprint, Fingerprint};
pub use store::{build_store, ProcessedStore};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("dedup_candidates_total", "Candidates offered to the dedup filter.");
        describe_counter!("dedup_known_total", "Candidates dropped as already processed.");
        describe_counter!("dedup_missing_url_total", "Candidates dropped for lack of a url.");
        describe_counter!(
            "dedup_store_unavailable_total",
            "Runs whose processed-set read failed."
        );
    });
}

/// Result of reading the processed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnownSet {
    Available(HashSet<Fingerprint>),
    Unavailable(StoreUnavailable),
}

impl KnownSet {
    pub fn empty() -> Self {
        KnownSet::Available(HashSet::new())
    }

    pub fn is_available(&self) -> bool {
        matches!(self, KnownSet::Available(_))
    }

    pub fn contains(&self, fp: &Fingerprint) -> bool {
        match self {
            KnownSet::Available(set) => set.contains(fp),
            KnownSet::Unavailable(_) => false,
        }
    }
}

impl FromIterator<Fingerprint> for KnownSet {
    fn from_iter<I: IntoIterator<Item = Fingerprint>>(iter: I) -> Self {
        KnownSet::Available(iter.into_iter().collect())
    }
}

/// What to do when the processed set cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupReadPolicy {
    /// Process nothing this run (no duplicate publish possible).
    #[default]
    SkipRun,
    /// Treat every candidate as new. Risks duplicates; opt-in only.
    ProcessAll,
}

/// Resolve an unavailable read according to `policy`.
pub fn apply_read_policy(known: KnownSet, policy: DedupReadPolicy) -> KnownSet {
    match (known, policy) {
        (KnownSet::Unavailable(e), DedupReadPolicy::ProcessAll) => {
            tracing::warn!(
                backend = e.backend,
                reason = %e.reason,
                "dedup read failed; PROCESS_ALL fallback treats every candidate as new (duplicates possible)"
            );
            KnownSet::empty()
        }
        (known, _) => known,
    }
}

/// Fingerprints of every candidate that has a url, in candidate order.
pub fn probe_fingerprints(candidates: &[Article]) -> Vec<Fingerprint> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter_map(Article::fingerprint)
        .filter(|fp| seen.insert(fp.clone()))
        .collect()
}

/// Candidates never processed before, in their original order.
///
/// An unavailable store yields nothing. Articles without a url are dropped
/// before fingerprinting. A url repeated within the batch is kept once.
pub fn filter_new(candidates: &[Article], known: &KnownSet) -> Vec<Article> {
    ensure_metrics_described();
    counter!("dedup_candidates_total").increment(candidates.len() as u64);

    let known_set = match known {
        KnownSet::Available(set) => set,
        KnownSet::Unavailable(e) => {
            counter!("dedup_store_unavailable_total").increment(1);
            tracing::warn!(
                backend = e.backend,
                reason = %e.reason,
                candidates = candidates.len(),
                "processed set unavailable; processing nothing this run"
            );
            return Vec::new();
        }
    };

    let mut batch_seen: HashSet<Fingerprint> = HashSet::new();
    let mut out = Vec::with_capacity(candidates.len());
    for article in candidates {
        let Some(url) = article.url.as_deref() else {
            counter!("dedup_missing_url_total").increment(1);
            continue;
        };
        let Ok(fp) = fingerprint(url) else {
            counter!("dedup_missing_url_total").increment(1);
            continue;
        };
        if known_set.contains(&fp) {
            counter!("dedup_known_total").increment(1);
            tracing::debug!(fingerprint = %fp, url, "already processed");
            continue;
        }
        if !batch_seen.insert(fp) {
            continue;
        }
        out.push(article.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn art(url: Option<&str>) -> Article {
        Article {
            title: format!("t {}", url.unwrap_or("none")),
            description: None,
            body: None,
            url: url.map(str::to_string),
            source_name: "test".into(),
            published_at: None,
        }
    }

    #[test]
    fn keeps_order_and_drops_known() {
        let cands = vec![art(Some("A")), art(Some("B")), art(Some("C"))];
        let known: KnownSet = [fingerprint("B").unwrap()].into_iter().collect();
        let out = filter_new(&cands, &known);
        let urls: Vec<_> = out.iter().map(|a| a.url.as_deref().unwrap()).collect();
        assert_eq!(urls, vec!["A", "C"]);
    }

    #[test]
    fn unavailable_store_filters_everything() {
        let cands = vec![art(Some("A")), art(Some("B"))];
        let known = KnownSet::Unavailable(StoreUnavailable::new("memory", "boom"));
        assert!(filter_new(&cands, &known).is_empty());
    }

    #[test]
    fn missing_or_blank_urls_are_excluded() {
        let cands = vec![art(None), art(Some("  ")), art(Some("A"))];
        let out = filter_new(&cands, &KnownSet::empty());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url.as_deref(), Some("A"));
    }

    #[test]
    fn duplicate_url_within_batch_kept_once() {
        let cands = vec![art(Some("A")), art(Some("A")), art(Some("B"))];
        let out = filter_new(&cands, &KnownSet::empty());
        assert_eq!(out.len(), 2);
        assert_eq!(probe_fingerprints(&cands).len(), 2);
    }

    #[test]
    fn process_all_policy_turns_unavailable_into_empty() {
        let un = KnownSet::Unavailable(StoreUnavailable::new("gist", "503"));
        assert_eq!(
            apply_read_policy(un.clone(), DedupReadPolicy::SkipRun),
            un
        );
        assert_eq!(
            apply_read_policy(un, DedupReadPolicy::ProcessAll),
            KnownSet::empty()
        );
    }
}
