//! Forwarder binary: relays events to the collector with retry and backoff.

use logpipe_server::runtime::{bootstrap, run_forwarder};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match bootstrap("forwarder") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("logpipe-forwarder: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run_forwarder(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "log forwarder failed");
            ExitCode::FAILURE
        }
    }
}
