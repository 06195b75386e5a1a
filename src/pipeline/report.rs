// src/pipeline/report.rs
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{RunOutcome, Stage};
use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Published,
    NothingToDo,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Published => "published",
            RunStatus::NothingToDo => "nothing_to_do",
            RunStatus::Failed => "failed",
        }
    }
}

/// What a trigger gets back from one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub stage: Stage,
    /// An artifact exists at the publish target (even if the run later failed).
    pub published: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub announcement_url: Option<String>,
    pub articles_processed: usize,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn from_result(
        result: &Result<RunOutcome, PipelineError>,
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        let duration_ms = elapsed.as_millis() as u64;
        match result {
            Ok(RunOutcome::NothingToDo { stage, reason }) => RunReport {
                status: RunStatus::NothingToDo,
                stage: *stage,
                published: false,
                message: reason.to_string(),
                publication_url: None,
                announcement_url: None,
                articles_processed: 0,
                warnings: Vec::new(),
                error: None,
                started_at,
                duration_ms,
            },
            Ok(RunOutcome::Published(p)) => {
                let mut warnings = Vec::new();
                if let Some(e) = &p.mark_error {
                    warnings.push(format!(
                        "processed set not updated, articles may be republished: {e}"
                    ));
                }
                if let Some(e) = &p.announcement_error {
                    warnings.push(e.to_string());
                }
                RunReport {
                    status: RunStatus::Published,
                    stage: Stage::Done,
                    published: true,
                    message: format!("published \"{}\"", p.title),
                    publication_url: Some(p.handle.url.clone()),
                    announcement_url: p.announcement.as_ref().and_then(|a| a.url.clone()),
                    articles_processed: p.articles.len(),
                    warnings,
                    error: None,
                    started_at,
                    duration_ms,
                }
            }
            Err(e) => {
                let publication = e.publication();
                let warnings = match publication {
                    Some(h) => vec![format!(
                        "article {} was published before the failure; processed set may be stale",
                        h.url
                    )],
                    None => Vec::new(),
                };
                RunReport {
                    status: RunStatus::Failed,
                    stage: e.stage(),
                    published: publication.is_some(),
                    message: format!("run failed while {}", e.stage()),
                    publication_url: publication.map(|h| h.url.clone()),
                    announcement_url: None,
                    articles_processed: 0,
                    warnings,
                    error: Some(e.to_string()),
                    started_at,
                    duration_ms,
                }
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.status != RunStatus::Failed
    }

    /// 200 for published / nothing to do, 500 for failures.
    pub fn http_status(&self) -> u16 {
        if self.is_success() {
            200
        } else {
            500
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::NothingToDoReason;
    use crate::publish::PublicationHandle;

    #[test]
    fn nothing_to_do_is_a_200() {
        let r = RunReport::from_result(
            &Ok(RunOutcome::NothingToDo {
                stage: Stage::Filtering,
                reason: NothingToDoReason::NoNewArticles,
            }),
            Utc::now(),
            Duration::from_millis(3),
        );
        assert_eq!(r.status, RunStatus::NothingToDo);
        assert_eq!(r.http_status(), 200);
        assert_eq!(r.message, "no new articles");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "nothing_to_do");
        assert_eq!(json["stage"], "filtering");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn timeout_after_publish_keeps_the_url() {
        let err = PipelineError::Timeout {
            stage: Stage::Marking,
            deadline: Duration::from_secs(1),
            publication: Some(PublicationHandle {
                url: "https://gh.test/pr/9".into(),
                identifier: "#9".into(),
                branch: None,
            }),
        };
        let r = RunReport::from_result(&Err(err), Utc::now(), Duration::from_secs(1));
        assert_eq!(r.http_status(), 500);
        assert_eq!(r.stage, Stage::Marking);
        assert!(r.published);
        assert_eq!(r.publication_url.as_deref(), Some("https://gh.test/pr/9"));
        assert_eq!(r.warnings.len(), 1);
    }
}
