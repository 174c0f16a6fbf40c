//! Generator binary: posts synthetic events to the forwarder.

use logpipe_server::generator::{resolve_client_name, run_generator};
use logpipe_server::runtime::{bootstrap, shutdown_signal};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match bootstrap("generator") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("logpipe-generator: {e}");
            return ExitCode::FAILURE;
        }
    };

    let generator = &config.generator;
    let client_name = resolve_client_name(generator.client_name.as_deref());

    match run_generator(
        &generator.listener_url,
        &client_name,
        generator.interval(),
        shutdown_signal(),
    )
    .await
    {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "log generator failed");
            ExitCode::FAILURE
        }
    }
}
