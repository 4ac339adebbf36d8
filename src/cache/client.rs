//! Cache port used by the todo repository.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation `{op}` timed out")]
    Timeout { op: &'static str },
    #[error("prefix `{prefix}` is not a key namespace")]
    UnsupportedPrefix { prefix: String },
}

impl CacheError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Key-value store with per-key expiry and namespace deletion.
///
/// Values are opaque bytes; encoding belongs to the caller.
#[async_trait]
pub trait CacheClient: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every key starting with `prefix` and return how many were removed.
    ///
    /// Implementations apply the removal as one step: a reader either sees the
    /// namespace as it was before the call or sees none of its keys.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheError>;
}
