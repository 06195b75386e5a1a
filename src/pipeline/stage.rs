// src/pipeline/stage.rs
use std::fmt;
use std::sync::Mutex;
use std::time::Instant;

use serde::Serialize;

use crate::publish::PublicationHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetching,
    Filtering,
    Synthesizing,
    Rendering,
    Publishing,
    Marking,
    Announcing,
    Done,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Fetching => "fetching",
            Stage::Filtering => "filtering",
            Stage::Synthesizing => "synthesizing",
            Stage::Rendering => "rendering",
            Stage::Publishing => "publishing",
            Stage::Marking => "marking",
            Stage::Announcing => "announcing",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct Inner {
    stage: Stage,
    entered: Instant,
    publication: Option<PublicationHandle>,
}

/// Where a run currently is. Read from outside the run future when it is
/// cancelled by the deadline or dies in a panic.
#[derive(Debug)]
pub struct RunProgress {
    inner: Mutex<Inner>,
}

impl Default for RunProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl RunProgress {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                stage: Stage::Fetching,
                entered: Instant::now(),
                publication: None,
            }),
        }
    }

    /// Move to `next`, recording how long the previous stage took.
    pub fn enter(&self, next: Stage) {
        let mut g = self.inner.lock().expect("progress mutex poisoned");
        let ms = g.entered.elapsed().as_secs_f64() * 1_000.0;
        metrics::histogram!("pipeline_stage_ms", "stage" => g.stage.as_str()).record(ms);
        tracing::debug!(from = %g.stage, to = %next, elapsed_ms = ms as u64, "stage transition");
        g.stage = next;
        g.entered = Instant::now();
    }

    pub fn set_publication(&self, handle: PublicationHandle) {
        self.inner.lock().expect("progress mutex poisoned").publication = Some(handle);
    }

    pub fn stage(&self) -> Stage {
        self.inner.lock().expect("progress mutex poisoned").stage
    }

    pub fn snapshot(&self) -> (Stage, Option<PublicationHandle>) {
        let g = self.inner.lock().expect("progress mutex poisoned");
        (g.stage, g.publication.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_lowercase() {
        assert_eq!(Stage::Synthesizing.to_string(), "synthesizing");
        assert_eq!(serde_json::to_string(&Stage::Done).unwrap(), "\"done\"");
    }

    #[test]
    fn progress_tracks_stage_and_publication() {
        let p = RunProgress::new();
        assert_eq!(p.stage(), Stage::Fetching);
        p.enter(Stage::Publishing);
        p.set_publication(PublicationHandle {
            url: "u".into(),
            identifier: "#1".into(),
            branch: None,
        });
        p.enter(Stage::Marking);
        let (stage, publication) = p.snapshot();
        assert_eq!(stage, Stage::Marking);
        assert_eq!(publication.map(|h| h.identifier), Some("#1".to_string()));
    }
}
