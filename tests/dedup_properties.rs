// tests/dedup_properties.rs
use std::collections::HashSet;

use rand::Rng;

use aurore_pipeline::dedup::store::MemoryStore;
use aurore_pipeline::dedup::{
    apply_read_policy, filter_new, fingerprint, DedupReadPolicy, KnownSet, ProcessedStore,
};
use aurore_pipeline::error::StoreUnavailable;
use aurore_pipeline::ingest::Article;

fn art(url: Option<&str>) -> Article {
    Article {
        title: "t".into(),
        description: None,
        body: None,
        url: url.map(str::to_string),
        source_name: "s".into(),
        published_at: None,
    }
}

fn random_url(rng: &mut impl Rng) -> String {
    let host = ["reuters.com", "bbc.co.uk", "example.org", "news.test"][rng.random_range(0..4)];
    let id: u64 = rng.random();
    let slug_len = rng.random_range(1..40);
    let slug: String = (0..slug_len)
        .map(|_| (b'a' + rng.random_range(0..26u8)) as char)
        .collect();
    format!("https://{host}/{slug}/{id}")
}

#[test]
fn fingerprint_is_deterministic_and_collision_free_on_a_large_corpus() {
    let mut rng = rand::rng();
    let urls: HashSet<String> = (0..20_000).map(|_| random_url(&mut rng)).collect();

    let mut seen = HashSet::with_capacity(urls.len());
    for u in &urls {
        let a = fingerprint(u).unwrap();
        let b = fingerprint(u).unwrap();
        assert_eq!(a, b, "same url must give the same fingerprint");
        assert_eq!(a.as_str().len(), 64);
        assert!(seen.insert(a), "collision for {u}");
    }
    assert_eq!(seen.len(), urls.len());
}

#[test]
fn near_identical_urls_get_distinct_fingerprints() {
    let variants = [
        "https://news.test/a",
        "https://news.test/a/",
        "http://news.test/a",
        "https://news.test/A",
        "https://news.test/a?utm=1",
    ];
    let set: HashSet<_> = variants.iter().map(|u| fingerprint(u).unwrap()).collect();
    assert_eq!(set.len(), variants.len());
}

#[tokio::test]
async fn marking_is_idempotent() {
    let store = MemoryStore::new();
    let fps: Vec<_> = ["https://n.test/1", "https://n.test/2"]
        .iter()
        .map(|u| fingerprint(u).unwrap())
        .collect();

    store.mark(&fps).await.unwrap();
    let once = store.snapshot();
    store.mark(&fps).await.unwrap();
    store.mark(&fps[..1]).await.unwrap();
    assert_eq!(store.snapshot(), once);
    assert_eq!(once.len(), 2);
}

#[test]
fn filter_preserves_order_and_drops_known_and_urlless() {
    let known: KnownSet = [fingerprint("https://n.test/b").unwrap()].into_iter().collect();
    let candidates = vec![
        art(Some("https://n.test/c")),
        art(None),
        art(Some("https://n.test/b")),
        art(Some("https://n.test/a")),
        art(Some("https://n.test/c")),
    ];
    let out: Vec<_> = filter_new(&candidates, &known)
        .into_iter()
        .filter_map(|a| a.url)
        .collect();
    assert_eq!(out, vec!["https://n.test/c", "https://n.test/a"]);
}

#[test]
fn unavailable_known_set_yields_nothing_unless_process_all() {
    let candidates = vec![art(Some("https://n.test/1"))];
    let down = KnownSet::Unavailable(StoreUnavailable::new("gist", "503"));

    let skip = apply_read_policy(down.clone(), DedupReadPolicy::SkipRun);
    assert!(filter_new(&candidates, &skip).is_empty());

    let all = apply_read_policy(down, DedupReadPolicy::ProcessAll);
    assert_eq!(filter_new(&candidates, &all).len(), 1);
}
