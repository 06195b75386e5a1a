// tests/common/mod.rs
//
// In-process fakes for the pipeline collaborators. Each one counts its calls
// and can be told to fail, stall or panic.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use aurore_pipeline::announce::{AnnouncementHandle, Announcer};
use aurore_pipeline::dedup::store::MemoryStore;
use aurore_pipeline::error::{AnnouncementError, FetchError};
use aurore_pipeline::ingest::{Article, FeedQuery, FeedSource};
use aurore_pipeline::pipeline::Pipeline;
use aurore_pipeline::publish::{PublicationHandle, Publisher};
use aurore_pipeline::render::{HtmlRenderer, RenderedDocument};
use aurore_pipeline::synth::{StructuredArticle, Synthesizer};

pub fn article(url: Option<&str>, title: &str) -> Article {
    Article {
        title: title.to_string(),
        description: Some(format!("{title} description")),
        body: None,
        url: url.map(str::to_string),
        source_name: "Test Wire".to_string(),
        published_at: None,
    }
}

pub fn query(max_count: usize) -> FeedQuery {
    FeedQuery {
        topic: "tech".into(),
        sources: vec![],
        language: "en".into(),
        max_count,
    }
}

pub enum FeedMode {
    Articles(Vec<Article>),
    Rejected,
    Transport,
}

pub struct FakeFeed {
    pub mode: Mutex<FeedMode>,
    pub calls: AtomicUsize,
}

impl FakeFeed {
    pub fn new(articles: Vec<Article>) -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(FeedMode::Articles(articles)),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn with_mode(mode: FeedMode) -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(mode),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_articles(&self, articles: Vec<Article>) {
        *self.mode.lock().unwrap() = FeedMode::Articles(articles);
    }
}

#[async_trait]
impl FeedSource for FakeFeed {
    async fn fetch(&self, _query: &FeedQuery) -> Result<Vec<Article>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.mode.lock().unwrap() {
            FeedMode::Articles(a) => Ok(a.clone()),
            FeedMode::Rejected => Err(FetchError::Rejected {
                code: "rateLimited".into(),
                message: "too many requests".into(),
            }),
            FeedMode::Transport => Err(FetchError::Transport(anyhow!("connection reset"))),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

#[derive(Default)]
pub struct FakeSynth {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    pub panic: AtomicBool,
    pub delay: Mutex<Option<Duration>>,
    pub announcement: Mutex<String>,
    pub seen: Mutex<Vec<Vec<String>>>,
}

impl FakeSynth {
    pub fn new() -> Arc<Self> {
        let s = Self::default();
        *s.announcement.lock().unwrap() = "Fresh synthesis out now".to_string();
        Arc::new(s)
    }
}

#[async_trait]
impl Synthesizer for FakeSynth {
    async fn synthesize(&self, articles: &[Article]) -> Result<StructuredArticle> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.seen
            .lock()
            .unwrap()
            .push(articles.iter().filter_map(|a| a.url.clone()).collect());
        let delay = *self.delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if self.panic.load(Ordering::SeqCst) {
            panic!("synthesizer blew up");
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("model quota exhausted"));
        }
        Ok(StructuredArticle {
            title: format!("Digest number {n}"),
            lead: "What happened.".into(),
            body_sections: articles.iter().map(|a| a.title.clone()).collect(),
            conclusion: "That is all.".into(),
            suggested_tags: vec!["tech".into()],
            cited_sources: articles.iter().map(|a| a.source_name.clone()).collect(),
            suggested_announcement: self.announcement.lock().unwrap().clone(),
            image_prompt: None,
        })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

#[derive(Default)]
pub struct FakePublisher {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    pub published: Mutex<Vec<String>>,
}

impl FakePublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(&self, title: &str, doc: &RenderedDocument) -> Result<PublicationHandle> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("422 Unprocessable Entity"));
        }
        self.published.lock().unwrap().push(title.to_string());
        Ok(PublicationHandle {
            url: format!("https://github.test/me/site/pull/{n}"),
            identifier: format!("#{n}"),
            branch: Some(format!("aurore/article-{}", doc.slug)),
        })
    }
}

#[derive(Default)]
pub struct FakeAnnouncer {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    pub delay: Mutex<Option<Duration>>,
}

impl FakeAnnouncer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl Announcer for FakeAnnouncer {
    async fn announce(
        &self,
        _text: &str,
        publication: &PublicationHandle,
    ) -> Result<AnnouncementHandle, AnnouncementError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(AnnouncementError::new("fake", anyhow!("401 Unauthorized")));
        }
        Ok(AnnouncementHandle {
            channel: "fake",
            url: Some(format!("{}#announced", publication.url)),
        })
    }

    fn channel(&self) -> &'static str {
        "fake"
    }
}

pub struct Harness {
    pub feed: Arc<FakeFeed>,
    pub store: Arc<MemoryStore>,
    pub synth: Arc<FakeSynth>,
    pub publisher: Arc<FakePublisher>,
    pub announcer: Arc<FakeAnnouncer>,
}

impl Harness {
    pub fn new(articles: Vec<Article>) -> Self {
        Self {
            feed: FakeFeed::new(articles),
            store: Arc::new(MemoryStore::new()),
            synth: FakeSynth::new(),
            publisher: FakePublisher::new(),
            announcer: FakeAnnouncer::new(),
        }
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            self.feed.clone(),
            self.store.clone(),
            self.synth.clone(),
            Arc::new(HtmlRenderer::default()),
            self.publisher.clone(),
            query(10),
        )
        .with_announcer(self.announcer.clone())
        .with_deadline(Duration::from_secs(5))
    }
}
