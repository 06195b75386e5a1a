// src/bin/run_once.rs
//! One pipeline run for cron-style triggers. Prints the JSON report to
//! stdout; exits 0 on published / nothing to do, 1 on failure.

use std::process::ExitCode;
use std::sync::Arc;

use aurore_pipeline::config::{PipelineConfig, Secrets};
use aurore_pipeline::{build_pipeline, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    logging::init();

    let pipeline = match PipelineConfig::load_default()
        .and_then(|cfg| build_pipeline(&cfg, &Secrets::from_env()))
    {
        Ok(p) => Arc::new(p),
        Err(e) => {
            let reason = format!("{e:#}");
            tracing::error!(error = %reason, "pipeline setup failed");
            eprintln!("setup failed: {reason}");
            return ExitCode::FAILURE;
        }
    };

    let report = pipeline.run_report().await;
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("could not serialize report: {e}"),
    }

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
