use std::time::Duration;

use thiserror::Error;

// ─── Store errors ────────────────────────────────────────────────

/// Everything that can go wrong while talking to the event store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Connection or transport failure.
    #[error("event store unavailable: {0}")]
    Unavailable(String),

    /// Malformed query or a store-side error.
    #[error("event store query failed: {0}")]
    QueryFailed(String),

    /// The store did not answer within the configured budget.
    #[error("event store call timed out after {0:?}")]
    Timeout(Duration),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            // redis-rs does not carry the elapsed budget
            Self::Timeout(Duration::ZERO)
        } else if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
        {
            Self::Unavailable(err.to_string())
        } else {
            Self::QueryFailed(err.to_string())
        }
    }
}

// ─── Scrape errors ───────────────────────────────────────────────

/// A scrape cycle aborted. The gauge registry is untouched when this is
/// returned.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to render exposition: {0}")]
    Render(#[from] prometheus::Error),
}

// ─── Config errors ───────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("look-back and look-ahead cannot both be zero")]
    EmptyWindow,

    #[error("{name} must be at most {max} seconds, got {got}")]
    WindowTooLarge {
        name: &'static str,
        max: u64,
        got: u64,
    },

    #[error("store timeout must be greater than zero")]
    ZeroTimeout,

    #[error("max destinations must be greater than zero")]
    ZeroDestinations,
}
