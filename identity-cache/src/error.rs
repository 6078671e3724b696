use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    /// No token store was configured. The gate cannot authenticate anyone.
    #[error("Identity cache backend required but not configured")]
    NoBackend,

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Identity cache lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed identity cache entry for key {key}: {reason}")]
    MalformedEntry { key: String, reason: String },

    #[error("Identity cache backend failure: {0}")]
    Backend(String),
}

impl CacheError {
    /// Whether this is a deployment problem rather than a transient fault.
    pub fn is_configuration(&self) -> bool {
        matches!(self, CacheError::NoBackend)
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
