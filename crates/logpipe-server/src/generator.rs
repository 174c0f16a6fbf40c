//! Synthetic event source.
//!
//! Emits one random event per interval to the forwarder. Useful for smoke
//! testing a deployment end to end; it is not part of the delivery path.

use chrono::Utc;
use logpipe_types::{Level, LogEvent};
use rand::seq::SliceRandom;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Message catalogue for generated events.
pub const MESSAGES: [&str; 10] = [
    "User login succeeded",
    "User login failed",
    "Payment processed",
    "Payment declined",
    "System timeout",
    "Cache refreshed",
    "Debugging request",
    "Service started",
    "Service stopped",
    "Configuration updated",
];

/// Timeout for each post to the forwarder.
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Client name used when neither configuration nor the host provides one.
pub const FALLBACK_CLIENT_NAME: &str = "logpipe-generator";

/// Chooses the `client_name` stamped on generated events: the configured
/// value (`generator.client_name` / `LOGPIPE_CLIENT_NAME`), else the system
/// host name, else [`FALLBACK_CLIENT_NAME`].
pub fn resolve_client_name(configured: Option<&str>) -> String {
    pick_client_name(configured, system_hostname())
}

fn pick_client_name(configured: Option<&str>, hostname: Option<String>) -> String {
    configured
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(|| hostname.filter(|h| !h.trim().is_empty()))
        .unwrap_or_else(|| FALLBACK_CLIENT_NAME.to_string())
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    match nix::unistd::gethostname() {
        Ok(name) => name.into_string().ok(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read system hostname");
            None
        }
    }
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok()
}

/// Builds one random event stamped with the current time.
pub fn generate_event<R: Rng + ?Sized>(rng: &mut R, client_name: &str) -> LogEvent {
    LogEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        level: *Level::ALL.choose(rng).unwrap_or(&Level::Info),
        message: MESSAGES.choose(rng).copied().unwrap_or_default().to_string(),
        client_name: client_name.to_string(),
        timestamp: Utc::now(),
    }
}

/// Posts a random event to `listener_url` every `interval` until `shutdown`
/// resolves. Failed sends are logged and the loop carries on.
///
/// # Errors
///
/// Returns the `reqwest` error if the HTTP client cannot be built.
pub async fn run_generator<S>(
    listener_url: &str,
    client_name: &str,
    interval: Duration,
    shutdown: S,
) -> Result<u64, reqwest::Error>
where
    S: Future<Output = ()>,
{
    let client = reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?;
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    tracing::info!(listener_url, client_name, "log generator started");
    let mut sent = 0u64;

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        let event = generate_event(&mut rand::thread_rng(), client_name);
        let short_id: String = event.event_id.chars().take(6).collect();

        match client.post(listener_url).json(&event).send().await {
            Ok(response) => {
                sent += 1;
                tracing::info!(
                    event_id = %short_id,
                    level = %event.level,
                    status = response.status().as_u16(),
                    "sent event"
                );
            }
            Err(e) => {
                tracing::warn!(event_id = %short_id, error = %e, "send error");
            }
        }
    }

    tracing::info!(sent, "log generator stopped");
    Ok(sent)
}
