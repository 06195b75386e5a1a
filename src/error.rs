// src/error.rs
//! Error taxonomy shared by the dedup core and the orchestrator.
//!
//! Collaborators use `anyhow` internally; these types are the boundary the
//! orchestrator reasons about. Only `PipelineError` is fatal to a run.

use std::time::Duration;

use thiserror::Error;

use crate::pipeline::Stage;
use crate::publish::PublicationHandle;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("article has no url; it cannot be deduplicated")]
    MissingUrl,
}

/// Feed collaborator failures. `Rejected` is an in-band "no usable answer"
/// from the API and ends the run as nothing-to-do; `Transport` is a failure.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("feed transport failure: {0:#}")]
    Transport(#[source] anyhow::Error),
    #[error("feed rejected the query ({code}): {message}")]
    Rejected { code: String, message: String },
}

/// The processed-set read failed. Degrades the run to "process nothing".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("processed-set store `{backend}` unavailable: {reason}")]
pub struct StoreUnavailable {
    pub backend: &'static str,
    pub reason: String,
}

impl StoreUnavailable {
    pub fn new(backend: &'static str, reason: impl Into<String>) -> Self {
        Self {
            backend,
            reason: reason.into(),
        }
    }
}

/// Writing fingerprints failed (fully or partially). Non-fatal after publish.
#[derive(Debug, Error)]
#[error("marking {failed}/{total} fingerprints on `{backend}` failed: {cause:#}")]
pub struct MarkError {
    pub backend: &'static str,
    pub total: usize,
    pub failed: usize,
    #[source]
    pub cause: anyhow::Error,
}

#[derive(Debug, Error)]
#[error("announcement via {channel} failed: {cause:#}")]
pub struct AnnouncementError {
    pub channel: &'static str,
    #[source]
    pub cause: anyhow::Error,
}

impl AnnouncementError {
    pub fn new(channel: &'static str, cause: anyhow::Error) -> Self {
        Self { channel, cause }
    }
}

/// Terminal `Failed(stage, cause)` of a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetching failed: {0}")]
    Fetch(#[source] FetchError),
    #[error("synthesis failed: {0:#}")]
    Synthesis(#[source] anyhow::Error),
    #[error("rendering failed: {0:#}")]
    Render(#[source] anyhow::Error),
    #[error("publishing failed: {0:#}")]
    Publish(#[source] anyhow::Error),
    #[error("run deadline of {deadline:?} exceeded while {stage}")]
    Timeout {
        stage: Stage,
        deadline: Duration,
        publication: Option<PublicationHandle>,
    },
    #[error("run aborted while {stage}: {message}")]
    Aborted {
        stage: Stage,
        message: String,
        publication: Option<PublicationHandle>,
    },
}

impl PipelineError {
    /// Stage the run was in when it failed.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Fetch(_) => Stage::Fetching,
            PipelineError::Synthesis(_) => Stage::Synthesizing,
            PipelineError::Render(_) => Stage::Rendering,
            PipelineError::Publish(_) => Stage::Publishing,
            PipelineError::Timeout { stage, .. } | PipelineError::Aborted { stage, .. } => *stage,
        }
    }

    /// The artifact that already exists despite the failure, if any.
    pub fn publication(&self) -> Option<&PublicationHandle> {
        match self {
            PipelineError::Timeout { publication, .. }
            | PipelineError::Aborted { publication, .. } => publication.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_is_reported_for_every_variant() {
        let e = PipelineError::Publish(anyhow::anyhow!("422"));
        assert_eq!(e.stage(), Stage::Publishing);
        assert!(e.publication().is_none());

        let t = PipelineError::Timeout {
            stage: Stage::Marking,
            deadline: Duration::from_secs(5),
            publication: Some(PublicationHandle {
                url: "https://example.test/pr/1".into(),
                identifier: "#1".into(),
                branch: None,
            }),
        };
        assert_eq!(t.stage(), Stage::Marking);
        assert_eq!(
            t.publication().map(|p| p.url.as_str()),
            Some("https://example.test/pr/1")
        );
        assert!(t.to_string().contains("marking"));
    }
}
