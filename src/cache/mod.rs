//! Todo list cache.
//!
//! List pages are cached per owner under `todos:{owner}:{digest}` and dropped a
//! whole owner at a time whenever that owner's todos change. Two clients share
//! the [`CacheClient`] port:
//!
//! - [`MemoryCache`]: in-process LRU with per-entry TTL
//! - [`RedisCache`]: Redis with a per-namespace key index
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "memory"   # or "redis"
//! ttl_seconds = 3600
//! # ... see config.rs for all options
//! ```

mod client;
mod config;
mod keys;
mod lock;
mod memory;
mod redis;

pub use client::{CacheClient, CacheError};
pub use config::{CacheBackend, CacheConfig};
pub use keys::{KEY_PREFIX, derive_key, owner_namespace};
pub use memory::MemoryCache;
pub use self::redis::RedisCache;
