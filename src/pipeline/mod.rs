// src/pipeline/mod.rs
//! Orchestrator: fetch → filter → synthesize → render → publish → mark →
//! announce.
//!
//! A run publishes at most one article, built from the batch of candidates
//! the processed set has never seen. The processed set is only written after
//! the publish target confirmed the artifact, so a failure before that point
//! leaves the same articles eligible for the next run, and a failure after it
//! never unpublishes anything.
//!
//! The core never retries. Every terminal state is either a [`RunOutcome`] or
//! a [`PipelineError`] naming the stage it happened in.

pub mod report;
pub mod stage;

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

use crate::announce::{AnnouncementHandle, Announcer};
use crate::dedup::{apply_read_policy, filter_new, probe_fingerprints, DedupReadPolicy, Fingerprint, KnownSet, ProcessedStore};
use crate::error::{AnnouncementError, FetchError, MarkError, PipelineError};
use crate::ingest::{fetch_candidates, Article, FeedQuery, FeedSource};
use crate::publish::{PublicationHandle, Publisher};
use crate::render::Renderer;
use crate::synth::Synthesizer;

pub use report::{RunReport, RunStatus};
pub use stage::{RunProgress, Stage};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pipeline_runs_total", "Pipeline runs by terminal status.");
        describe_counter!(
            "pipeline_mark_errors_total",
            "Published runs whose processed-set write failed."
        );
        describe_counter!(
            "pipeline_announce_errors_total",
            "Published runs whose announcement failed."
        );
        describe_histogram!("pipeline_stage_ms", "Time spent per stage in milliseconds.");
    });
}

/// Why a run ended without publishing. Not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NothingToDoReason {
    EmptyFeed,
    FeedRejected(String),
    NoNewArticles,
    StoreUnavailable(String),
}

impl std::fmt::Display for NothingToDoReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NothingToDoReason::EmptyFeed => f.write_str("feed returned no articles"),
            NothingToDoReason::FeedRejected(m) => write!(f, "feed rejected the query: {m}"),
            NothingToDoReason::NoNewArticles => f.write_str("no new articles"),
            NothingToDoReason::StoreUnavailable(m) => {
                write!(f, "processed set unreadable, processing nothing: {m}")
            }
        }
    }
}

/// A successful publish and everything that happened after it.
#[derive(Debug)]
pub struct Publication {
    pub handle: PublicationHandle,
    pub title: String,
    /// The new articles the piece was built from.
    pub articles: Vec<Article>,
    /// Fingerprints handed to the processed set.
    pub marked: Vec<Fingerprint>,
    pub mark_error: Option<MarkError>,
    /// Suggested announcement from the synthesis; blank skips announcing.
    pub announcement_text: String,
    pub announcement: Option<AnnouncementHandle>,
    pub announcement_error: Option<AnnouncementError>,
}

#[derive(Debug)]
pub enum RunOutcome {
    NothingToDo { stage: Stage, reason: NothingToDoReason },
    Published(Publication),
}

impl RunOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, RunOutcome::Published(_))
    }
}

/// One configured pipeline. Cheap to share behind an `Arc`; runs do not
/// lock each other out.
pub struct Pipeline {
    feed: Arc<dyn FeedSource>,
    store: Arc<dyn ProcessedStore>,
    synthesizer: Arc<dyn Synthesizer>,
    renderer: Arc<dyn Renderer>,
    publisher: Arc<dyn Publisher>,
    announcer: Option<Arc<dyn Announcer>>,
    query: FeedQuery,
    read_policy: DedupReadPolicy,
    deadline: Duration,
}

impl Pipeline {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        store: Arc<dyn ProcessedStore>,
        synthesizer: Arc<dyn Synthesizer>,
        renderer: Arc<dyn Renderer>,
        publisher: Arc<dyn Publisher>,
        query: FeedQuery,
    ) -> Self {
        Self {
            feed,
            store,
            synthesizer,
            renderer,
            publisher,
            announcer: None,
            query,
            read_policy: DedupReadPolicy::SkipRun,
            deadline: Duration::from_secs(25),
        }
    }

    pub fn with_announcer(mut self, announcer: Arc<dyn Announcer>) -> Self {
        self.announcer = Some(announcer);
        self
    }

    pub fn with_read_policy(mut self, policy: DedupReadPolicy) -> Self {
        self.read_policy = policy;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn store(&self) -> &Arc<dyn ProcessedStore> {
        &self.store
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Execute one run under the configured deadline.
    pub async fn run(&self) -> Result<RunOutcome, PipelineError> {
        let progress = RunProgress::new();
        self.run_tracked(&progress).await
    }

    /// Execute one run in its own task and summarize it for a trigger. A
    /// panic inside a collaborator becomes `Aborted` at the stage in progress.
    pub async fn run_report(self: &Arc<Self>) -> RunReport {
        ensure_metrics_described();
        let started_at = chrono::Utc::now();
        let t0 = Instant::now();
        let progress = Arc::new(RunProgress::new());

        let me = Arc::clone(self);
        let p = Arc::clone(&progress);
        let joined = tokio::spawn(async move { me.run_tracked(&p).await }).await;

        let result = match joined {
            Ok(result) => result,
            Err(join_err) => {
                let (stage, publication) = progress.snapshot();
                let message = if join_err.is_panic() {
                    panic_message(join_err.into_panic())
                } else {
                    "run task cancelled".to_string()
                };
                tracing::error!(stage = %stage, message = %message, "pipeline run aborted");
                Err(PipelineError::Aborted {
                    stage,
                    message,
                    publication,
                })
            }
        };

        let report = RunReport::from_result(&result, started_at, t0.elapsed());
        counter!("pipeline_runs_total", "status" => report.status.as_str()).increment(1);
        report
    }

    async fn run_tracked(&self, progress: &RunProgress) -> Result<RunOutcome, PipelineError> {
        ensure_metrics_described();
        let started = Instant::now();
        let outcome = match tokio::time::timeout(self.deadline, self.execute(progress)).await {
            Ok(result) => result?,
            Err(_) => {
                let (stage, publication) = progress.snapshot();
                tracing::error!(
                    stage = %stage,
                    deadline_ms = self.deadline.as_millis() as u64,
                    published = publication.is_some(),
                    "pipeline run exceeded its deadline"
                );
                return Err(PipelineError::Timeout {
                    stage,
                    deadline: self.deadline,
                    publication,
                });
            }
        };

        // Announcing sits outside the run deadline; its own expiry is non-fatal.
        match outcome {
            RunOutcome::Published(mut publication) => {
                progress.enter(Stage::Announcing);
                let budget = self.deadline.saturating_sub(started.elapsed());
                self.announce(&mut publication, budget).await;
                progress.enter(Stage::Done);
                tracing::info!(url = %publication.handle.url, title = %publication.title, "run published");
                Ok(RunOutcome::Published(publication))
            }
            other => Ok(other),
        }
    }

    /// Announce under whatever is left of the run budget. Every failure,
    /// expiry included, is recorded on the publication.
    async fn announce(&self, publication: &mut Publication, budget: Duration) {
        let Some(announcer) = &self.announcer else {
            return;
        };
        let text = publication.announcement_text.trim();
        if text.is_empty() {
            tracing::info!(channel = announcer.channel(), "no announcement text; skipping");
            return;
        }

        let result = match tokio::time::timeout(budget, announcer.announce(text, &publication.handle)).await {
            Ok(result) => result,
            Err(_) => Err(AnnouncementError::new(
                announcer.channel(),
                anyhow::anyhow!("timed out after {} ms", budget.as_millis()),
            )),
        };
        match result {
            Ok(h) => publication.announcement = Some(h),
            Err(e) => {
                counter!("pipeline_announce_errors_total").increment(1);
                tracing::warn!(channel = e.channel, error = %e, "announcement failed");
                publication.announcement_error = Some(e);
            }
        }
    }

    async fn execute(&self, progress: &RunProgress) -> Result<RunOutcome, PipelineError> {
        // Fetching
        progress.enter(Stage::Fetching);
        let mut candidates = match fetch_candidates(self.feed.as_ref(), &self.query).await {
            Ok(articles) => articles,
            Err(FetchError::Rejected { code, message }) => {
                return Ok(nothing(
                    Stage::Fetching,
                    NothingToDoReason::FeedRejected(format!("{code}: {message}")),
                ));
            }
            Err(e) => return Err(PipelineError::Fetch(e)),
        };
        candidates.truncate(self.query.max_count);
        if candidates.is_empty() {
            return Ok(nothing(Stage::Fetching, NothingToDoReason::EmptyFeed));
        }

        // Filtering
        progress.enter(Stage::Filtering);
        let probe = probe_fingerprints(&candidates);
        let known = if probe.is_empty() {
            KnownSet::empty()
        } else {
            self.store.contains_batch(&probe).await
        };
        let known = apply_read_policy(known, self.read_policy);
        let fresh = filter_new(&candidates, &known);
        if fresh.is_empty() {
            let reason = match known {
                KnownSet::Unavailable(e) => NothingToDoReason::StoreUnavailable(e.to_string()),
                KnownSet::Available(_) => NothingToDoReason::NoNewArticles,
            };
            return Ok(nothing(Stage::Filtering, reason));
        }
        tracing::info!(candidates = candidates.len(), new = fresh.len(), "new articles selected");

        // Synthesizing
        progress.enter(Stage::Synthesizing);
        let article = self
            .synthesizer
            .synthesize(&fresh)
            .await
            .map_err(PipelineError::Synthesis)?;
        article.validate().map_err(PipelineError::Synthesis)?;

        // Rendering
        progress.enter(Stage::Rendering);
        let doc = self.renderer.render(&article).map_err(PipelineError::Render)?;

        // Publishing
        progress.enter(Stage::Publishing);
        let handle = self
            .publisher
            .publish(&article.title, &doc)
            .await
            .map_err(PipelineError::Publish)?;
        progress.set_publication(handle.clone());

        // Marking
        progress.enter(Stage::Marking);
        let marked: Vec<Fingerprint> = fresh.iter().filter_map(Article::fingerprint).collect();
        let mark_error = match self.store.mark(&marked).await {
            Ok(()) => {
                tracing::info!(backend = self.store.backend(), count = marked.len(), "articles marked processed");
                None
            }
            Err(e) => {
                counter!("pipeline_mark_errors_total").increment(1);
                tracing::error!(
                    backend = e.backend,
                    failed = e.failed,
                    total = e.total,
                    publication = %handle.url,
                    error = %e,
                    "published but processed set NOT updated; these articles may be republished"
                );
                Some(e)
            }
        };

        Ok(RunOutcome::Published(Publication {
            handle,
            title: article.title,
            articles: fresh,
            marked,
            mark_error,
            announcement_text: article.suggested_announcement,
            announcement: None,
            announcement_error: None,
        }))
    }
}

fn nothing(stage: Stage, reason: NothingToDoReason) -> RunOutcome {
    tracing::info!(stage = %stage, reason = %reason, "nothing to do");
    RunOutcome::NothingToDo { stage, reason }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
