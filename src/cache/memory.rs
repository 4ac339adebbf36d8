//! In-process cache client.
//!
//! Entries live in an LRU bounded by `memory_capacity` and expire after their TTL.
//! A sorted key index turns namespace deletion into a range walk over the
//! namespace's own keys instead of a scan of the whole cache.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::ops::Bound;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;

use super::client::{CacheClient, CacheError};
use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const METRIC_CACHE_EVICT: &str = "todo_cache_evict_total";

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

struct Inner {
    entries: LruCache<String, Entry>,
    index: BTreeSet<String>,
}

impl Inner {
    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.index
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|key| key.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn remove(&mut self, key: &str) -> bool {
        self.index.remove(key);
        self.entries.pop(key).is_some()
    }

    /// Drop `key` if it has expired; returns whether a live entry remains.
    fn retain_live(&mut self, key: &str, now: Instant) -> bool {
        let expired = match self.entries.peek(key) {
            Some(entry) => entry.is_expired(now),
            None => return false,
        };
        if expired {
            self.remove(key);
        }
        !expired
    }
}

pub struct MemoryCache {
    inner: RwLock<Inner>,
}

impl MemoryCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: LruCache::new(capacity),
                index: BTreeSet::new(),
            }),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.memory_capacity_non_zero())
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        rw_read(&self.inner, "memory.len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys currently stored under `prefix`, in lexical order.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        rw_read(&self.inner, "memory.keys_with_prefix").keys_with_prefix(prefix)
    }

    pub fn clear(&self) {
        let mut inner = rw_write(&self.inner, "memory.clear");
        inner.entries.clear();
        inner.index.clear();
    }
}

#[async_trait]
impl CacheClient for MemoryCache {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut inner = rw_write(&self.inner, "memory.exists");
        Ok(inner.retain_live(key, Instant::now()))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut inner = rw_write(&self.inner, "memory.get");
        if !inner.retain_live(key, Instant::now()) {
            return Ok(None);
        }
        Ok(inner.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };

        let mut inner = rw_write(&self.inner, "memory.set");
        if let Some((displaced, _)) = inner.entries.push(key.to_string(), entry) {
            // `push` hands back the old value when the key was already present.
            if displaced != key {
                inner.index.remove(&displaced);
                counter!(METRIC_CACHE_EVICT, "backend" => "memory").increment(1);
            }
        }
        inner.index.insert(key.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        rw_write(&self.inner, "memory.delete").remove(key);
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let now = Instant::now();
        let mut inner = rw_write(&self.inner, "memory.delete_by_prefix");
        let doomed = inner.keys_with_prefix(prefix);

        // Expired entries are purged too but do not count as removed.
        let mut removed = 0u64;
        for key in &doomed {
            let live = inner
                .entries
                .peek(key)
                .is_some_and(|entry| !entry.is_expired(now));
            if inner.remove(key) && live {
                removed += 1;
            }
        }

        Ok(removed)
    }
}
