//! Opening database connections with a bounded, fixed-delay retry.

use std::future::Future;
use std::time::Duration;

use sqlx::{Connection, PgConnection};
use tracing::{debug, error, info, warn};

use crate::config::ConnectionDescriptor;
use crate::error::{PipelineError, Result};

/// Maximum number of connection attempts before giving up.
pub const MAX_CONNECT_ATTEMPTS: u32 = 10;

/// Pause between two connection attempts.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_CONNECT_ATTEMPTS,
            delay: RETRY_DELAY,
        }
    }
}

/// Opens a fresh connection to the target database.
pub async fn connect(descriptor: &ConnectionDescriptor, policy: &RetryPolicy) -> Result<PgConnection> {
    let options = descriptor.connect_options();
    debug!(target_db = %descriptor, "opening database connection");
    connect_with_retry(policy, || PgConnection::connect_with(options)).await
}

/// Runs `attempt` until it succeeds, fails with a non-transient error, or the
/// policy's attempt budget is spent. The delay is only slept between attempts.
pub async fn connect_with_retry<T, F, Fut>(policy: &RetryPolicy, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut current = 1;

    loop {
        match attempt().await {
            Ok(conn) => {
                if current > 1 {
                    info!(attempt = current, "database connection established after retry");
                }
                return Ok(conn);
            }
            Err(err) if !is_transient(&err) => {
                error!(error = %err, "database connection failed with a non-transient error");
                return Err(PipelineError::Connect(err));
            }
            Err(err) if current >= max_attempts => {
                error!(
                    attempts = current,
                    error = %err,
                    "maximum connection attempts reached; stopping"
                );
                return Err(PipelineError::ConnectionExhausted {
                    attempts: current,
                    source: err,
                });
            }
            Err(err) => {
                warn!(
                    attempt = current,
                    max_attempts,
                    delay_secs = policy.delay.as_secs_f64(),
                    error = %err,
                    "could not connect to database; retrying"
                );
                tokio::time::sleep(policy.delay).await;
                current += 1;
            }
        }
    }
}

/// Whether a connection error is worth another attempt.
pub fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db.code().as_deref().is_some_and(is_transient_sqlstate),
        _ => false,
    }
}

/// SQLSTATEs raised while the server is starting, shutting down, unreachable
/// or out of connection slots.
pub fn is_transient_sqlstate(code: &str) -> bool {
    code.starts_with("08") || code.starts_with("53") || matches!(code, "57P01" | "57P02" | "57P03")
}
