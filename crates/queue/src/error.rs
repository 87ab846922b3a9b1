//! Queue error types.

use thiserror::Error;

/// Errors raised while setting up the Redis queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Connection pool could not be created.
    #[error("redis pool error: {0}")]
    Pool(String),

    /// Redis command or connection failure.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl QueueError {
    /// Create a pool error.
    #[must_use]
    pub fn pool(msg: impl Into<String>) -> Self {
        Self::Pool(msg.into())
    }
}
