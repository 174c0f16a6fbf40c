//! Collector binary: owns the log store and serves ingest and query routes.

use logpipe_server::runtime::{bootstrap, run_collector};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match bootstrap("collector") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("logpipe-collector: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run_collector(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "log collector failed");
            ExitCode::FAILURE
        }
    }
}
