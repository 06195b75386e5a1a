//! News pipeline service — binary entrypoint.
//! Boots the Axum trigger API (and optionally the in-process scheduler).

use std::sync::Arc;
use std::time::Duration;

use shuttle_axum::ShuttleAxum;

use aurore_pipeline::api::{self, AppState};
use aurore_pipeline::config::{PipelineConfig, Secrets};
use aurore_pipeline::metrics::Metrics;
use aurore_pipeline::{build_pipeline, logging, scheduler};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    logging::init();

    let cfg = PipelineConfig::load_default().map_err(shuttle_runtime::Error::Custom)?;
    let secrets = Secrets::from_env();
    tracing::debug!(?secrets, "secrets loaded");

    let pipeline = Arc::new(build_pipeline(&cfg, &secrets).map_err(shuttle_runtime::Error::Custom)?);
    let state = AppState::new(Arc::clone(&pipeline));

    if cfg.run.schedule_interval_secs > 0 {
        scheduler::spawn_scheduler(
            pipeline,
            Arc::clone(&state.history),
            Duration::from_secs(cfg.run.schedule_interval_secs),
        );
        tracing::info!(every_secs = cfg.run.schedule_interval_secs, "in-process scheduler started");
    }

    let mut router = api::router(state);
    match Metrics::init(cfg.run.timeout_secs) {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!(error = %e, "metrics exporter disabled"),
    }

    Ok(router.into())
}
