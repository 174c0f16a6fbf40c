//! Startup initialization: open the pool and apply the schema, retrying
//! with a fixed delay while the database is unavailable.

use std::time::Duration;

use thiserror::Error;

use crate::migrations::{run_migrations, MigrationError};
use crate::pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};

/// Bounded fixed-delay retry policy for schema initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitPolicy {
    /// Total number of attempts, including the first.
    pub attempts: u32,
    /// Delay between consecutive attempts.
    pub delay: Duration,
}

impl Default for InitPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_secs(2),
        }
    }
}

/// Why a single initialization attempt failed.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// The pool could not be built.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// No connection could be checked out of the pool.
    #[error("failed to get database connection: {0}")]
    Connection(#[from] r2d2::Error),

    /// The schema could not be applied.
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

/// Errors returned by [`open_with_retry`].
#[derive(Debug, Error)]
pub enum InitError {
    /// Every attempt failed; the store cannot become ready.
    #[error("database unavailable after {attempts} attempts: {last}")]
    Unavailable {
        /// How many attempts were made.
        attempts: u32,
        /// The error from the final attempt.
        last: AttemptError,
    },

    /// The policy allowed no attempts at all.
    #[error("database initialization policy allows zero attempts")]
    NoAttempts,
}

/// Opens a pool at `db_path` and applies all pending migrations.
///
/// Each failed attempt is logged and followed by `policy.delay` before the
/// next one. This call blocks the current thread; async callers should run
/// it through `spawn_blocking`.
///
/// # Errors
///
/// Returns `InitError::Unavailable` carrying the last failure once
/// `policy.attempts` attempts have failed.
pub fn open_with_retry(
    db_path: &str,
    settings: DbRuntimeSettings,
    policy: InitPolicy,
) -> Result<DbPool, InitError> {
    let mut last = None;

    for attempt in 1..=policy.attempts {
        match try_open(db_path, settings) {
            Ok((pool, applied)) => {
                tracing::info!(attempt, applied, path = db_path, "log store schema ready");
                return Ok(pool);
            }
            Err(e) => {
                tracing::warn!(
                    attempt,
                    max_attempts = policy.attempts,
                    error = %e,
                    "waiting for database"
                );
                last = Some(e);
                if attempt < policy.attempts {
                    std::thread::sleep(policy.delay);
                }
            }
        }
    }

    match last {
        Some(last) => Err(InitError::Unavailable {
            attempts: policy.attempts,
            last,
        }),
        None => Err(InitError::NoAttempts),
    }
}

fn try_open(db_path: &str, settings: DbRuntimeSettings) -> Result<(DbPool, usize), AttemptError> {
    let pool = create_pool(db_path, settings)?;
    let applied = {
        let conn = pool.get()?;
        run_migrations(&conn)?
    };
    Ok((pool, applied))
}
