//! Database layer for logpipe.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! embedded SQL migrations, and the startup routine that brings the store
//! from "no schema" to "ready".
//!
//! Store operations never open connections themselves. They borrow one from
//! the pool created here, which keeps the query code independent of how
//! connections are pooled.

mod init;
mod migrations;
mod pool;

pub use init::{open_with_retry, AttemptError, InitError, InitPolicy};
pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
