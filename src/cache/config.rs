//! Cache configuration.
//!
//! Controls the todo list cache via the `[cache]` table of `todo-cache.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

// Default values for cache configuration
const DEFAULT_TTL_SECS: u64 = 60 * 60;
const DEFAULT_TIMEOUT_MS: u64 = 250;
const DEFAULT_MEMORY_CAPACITY: usize = 10_000;

/// Which cache client backs the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Serve list reads through the cache and invalidate on writes.
    pub enabled: bool,
    pub backend: CacheBackend,
    pub redis_url: Option<String>,
    /// Lifetime of a cached list page.
    pub ttl_seconds: u64,
    /// Upper bound for a single cache call before it counts as a miss.
    pub timeout_ms: u64,
    /// Maximum entries held by the in-process cache.
    pub memory_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Memory,
            redis_url: None,
            ttl_seconds: DEFAULT_TTL_SECS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// Entry lifetime, never shorter than one second.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }

    /// Returns the memory capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
