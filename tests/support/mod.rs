//! Test doubles shared by the repository integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use todo_cache::application::repos::{
    CreateTodoParams, RepoError, TodoCriteria, TodoPatch, TodoRecord, TodoStore,
};
use todo_cache::application::todos::{RepositoryOptions, TodoRepository};
use todo_cache::cache::{CacheClient, CacheError, MemoryCache};
use todo_cache::domain::TodoId;
use todo_cache::infra::memory::InMemoryTodoStore;

pub const CACHE_CAPACITY: usize = 64;

/// Store wrapper counting every call that reaches the backing store.
#[derive(Default)]
pub struct CountingStore {
    pub inner: InMemoryTodoStore,
    pub queries: AtomicUsize,
    pub counts: AtomicUsize,
    pub inserts: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl CountingStore {
    pub fn reads(&self) -> usize {
        self.queries.load(Ordering::SeqCst) + self.counts.load(Ordering::SeqCst)
    }

    pub fn mutations(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
            + self.updates.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TodoStore for CountingStore {
    async fn query(
        &self,
        criteria: &TodoCriteria,
        offset: Option<u64>,
        limit: Option<u32>,
    ) -> Result<Vec<TodoRecord>, RepoError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(criteria, offset, limit).await
    }

    async fn count(&self, criteria: &TodoCriteria) -> Result<u64, RepoError> {
        self.counts.fetch_add(1, Ordering::SeqCst);
        self.inner.count(criteria).await
    }

    async fn insert(&self, params: CreateTodoParams) -> Result<TodoRecord, RepoError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(params).await
    }

    async fn update_by_id(
        &self,
        id: TodoId,
        criteria: &TodoCriteria,
        patch: TodoPatch,
    ) -> Result<TodoRecord, RepoError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update_by_id(id, criteria, patch).await
    }

    async fn delete_by_id(&self, id: TodoId, criteria: &TodoCriteria) -> Result<(), RepoError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_by_id(id, criteria).await
    }
}

/// Store whose every call fails, or hangs when `delay` is set.
pub struct BrokenStore {
    pub delay: Option<Duration>,
}

impl BrokenStore {
    async fn fail<T>(&self) -> Result<T, RepoError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Err(RepoError::from_persistence("connection refused"))
    }
}

#[async_trait]
impl TodoStore for BrokenStore {
    async fn query(
        &self,
        _criteria: &TodoCriteria,
        _offset: Option<u64>,
        _limit: Option<u32>,
    ) -> Result<Vec<TodoRecord>, RepoError> {
        self.fail().await
    }

    async fn count(&self, _criteria: &TodoCriteria) -> Result<u64, RepoError> {
        self.fail().await
    }

    async fn insert(&self, _params: CreateTodoParams) -> Result<TodoRecord, RepoError> {
        self.fail().await
    }

    async fn update_by_id(
        &self,
        _id: TodoId,
        _criteria: &TodoCriteria,
        _patch: TodoPatch,
    ) -> Result<TodoRecord, RepoError> {
        self.fail().await
    }

    async fn delete_by_id(&self, _id: TodoId, _criteria: &TodoCriteria) -> Result<(), RepoError> {
        self.fail().await
    }
}

/// Memory cache wrapper counting writes and namespace deletes.
pub struct CountingCache {
    pub inner: MemoryCache,
    pub sets: AtomicUsize,
    pub prefix_deletes: AtomicUsize,
}

impl Default for CountingCache {
    fn default() -> Self {
        Self {
            inner: memory_cache(),
            sets: AtomicUsize::new(0),
            prefix_deletes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CacheClient for CountingCache {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.inner.exists(key).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.inner.delete(key).await
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        self.prefix_deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_by_prefix(prefix).await
    }
}

/// Cache whose every call fails, or hangs when `delay` is set.
pub struct BrokenCache {
    pub delay: Option<Duration>,
}

impl BrokenCache {
    async fn fail<T>(&self) -> Result<T, CacheError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Err(CacheError::unavailable("connection reset"))
    }
}

#[async_trait]
impl CacheClient for BrokenCache {
    async fn exists(&self, _key: &str) -> Result<bool, CacheError> {
        self.fail().await
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.fail().await
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        self.fail().await
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        self.fail().await
    }

    async fn delete_by_prefix(&self, _prefix: &str) -> Result<u64, CacheError> {
        self.fail().await
    }
}

pub fn memory_cache() -> MemoryCache {
    MemoryCache::new(std::num::NonZeroUsize::new(CACHE_CAPACITY).expect("non-zero capacity"))
}

pub fn repository(store: Arc<dyn TodoStore>, cache: Arc<dyn CacheClient>) -> TodoRepository {
    TodoRepository::with_options(store, cache, RepositoryOptions::default())
}
