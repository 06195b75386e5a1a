// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::history::RunHistory;
use crate::pipeline::Pipeline;

/// Run the pipeline every `interval`, starting immediately. Ticks missed
/// while a run is still going are skipped, not bunched up.
pub fn spawn_scheduler(
    pipeline: Arc<Pipeline>,
    history: Arc<RunHistory>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let report = pipeline.run_report().await;
            history.push(&report);

            counter!("pipeline_scheduled_runs_total").increment(1);
            gauge!("pipeline_last_run_ts").set(report.started_at.timestamp().max(0) as f64);

            tracing::info!(
                target: "scheduler",
                status = report.status.as_str(),
                stage = %report.stage,
                duration_ms = report.duration_ms,
                "scheduled run finished"
            );
        }
    })
}
