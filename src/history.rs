//! history.rs — in-memory ring buffer of recent run reports for `/runs`.

use std::sync::Mutex;

use crate::pipeline::RunReport;

#[derive(Debug)]
pub struct RunHistory {
    inner: Mutex<Vec<RunReport>>,
    cap: usize,
}

impl RunHistory {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.clamp(1, 10_000);
        Self {
            inner: Mutex::new(Vec::with_capacity(cap)),
            cap,
        }
    }

    pub fn push(&self, report: &RunReport) {
        let mut v = self.inner.lock().expect("history mutex poisoned");
        v.push(report.clone());
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
    }

    /// Most recent `n` reports, oldest first.
    pub fn snapshot_last_n(&self, n: usize) -> Vec<RunReport> {
        let v = self.inner.lock().expect("history mutex poisoned");
        let start = v.len().saturating_sub(n);
        v[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("history mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{RunStatus, Stage};

    fn report(msg: &str) -> RunReport {
        RunReport {
            status: RunStatus::NothingToDo,
            stage: Stage::Filtering,
            published: false,
            message: msg.into(),
            publication_url: None,
            announcement_url: None,
            articles_processed: 0,
            warnings: vec![],
            error: None,
            started_at: chrono::Utc::now(),
            duration_ms: 1,
        }
    }

    #[test]
    fn keeps_only_the_newest_entries() {
        let h = RunHistory::with_capacity(2);
        for m in ["a", "b", "c"] {
            h.push(&report(m));
        }
        let msgs: Vec<_> = h.snapshot_last_n(10).into_iter().map(|r| r.message).collect();
        assert_eq!(msgs, vec!["b", "c"]);
        assert_eq!(h.snapshot_last_n(1)[0].message, "c");
    }
}
