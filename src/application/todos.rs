//! Todo repository with a read-through list cache.
//!
//! List reads are served from the cache when an entry exists under the derived
//! key and fall through to the store otherwise. Writes go to the store first and
//! then drop the owner's whole cache namespace, since keys are digests and the
//! affected entries cannot be named individually.
//!
//! Cache failures and timeouts never fail a call: reads degrade to a miss and
//! invalidations are logged and skipped. Store failures and timeouts surface as
//! [`TodoError::StoreUnavailable`].

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tracing::{debug, instrument, warn};

use crate::application::error::TodoError;
use crate::application::pagination::{Window, page_count};
use crate::application::repos::{CreateTodoParams, RepoError, TodoCriteria, TodoStore};
use crate::cache::{CacheClient, CacheConfig, CacheError, derive_key, owner_namespace};
use crate::domain::{
    NewTodo, OwnerId, Todo, TodoChanges, TodoFilter, TodoId, TodoPage, TodoPagination,
};

const METRIC_CACHE_HIT: &str = "todo_cache_hit_total";
const METRIC_CACHE_MISS: &str = "todo_cache_miss_total";
const METRIC_CACHE_ERROR: &str = "todo_cache_error_total";
const METRIC_CACHE_DECODE_ERROR: &str = "todo_cache_decode_error_total";
const METRIC_CACHE_INVALIDATE: &str = "todo_cache_invalidate_total";
const METRIC_STORE_QUERY_MS: &str = "todo_store_query_ms";

const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryOptions {
    /// Route list reads through the cache and invalidate on writes.
    pub cache_enabled: bool,
    pub ttl: Duration,
    pub cache_timeout: Duration,
    pub store_timeout: Duration,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default(), DEFAULT_STORE_TIMEOUT)
    }
}

impl RepositoryOptions {
    pub fn from_config(cache: &CacheConfig, store_timeout: Duration) -> Self {
        Self {
            cache_enabled: cache.enabled,
            ttl: cache.ttl(),
            cache_timeout: cache.timeout(),
            store_timeout,
        }
    }
}

#[derive(Clone)]
pub struct TodoRepository {
    store: Arc<dyn TodoStore>,
    cache: Arc<dyn CacheClient>,
    options: RepositoryOptions,
}

impl TodoRepository {
    pub fn new(store: Arc<dyn TodoStore>, cache: Arc<dyn CacheClient>) -> Self {
        Self::with_options(store, cache, RepositoryOptions::default())
    }

    pub fn with_options(
        store: Arc<dyn TodoStore>,
        cache: Arc<dyn CacheClient>,
        options: RepositoryOptions,
    ) -> Self {
        Self {
            store,
            cache,
            options,
        }
    }

    pub fn options(&self) -> &RepositoryOptions {
        &self.options
    }

    /// List the owner's live todos matching `filter`, windowed by `pagination`.
    ///
    /// Missing filter or pagination is the same query as an empty one and shares
    /// its cache key.
    #[instrument(skip(self, filter, pagination), fields(owner = %owner))]
    pub async fn find_all(
        &self,
        owner: OwnerId,
        filter: Option<&TodoFilter>,
        pagination: Option<&TodoPagination>,
    ) -> Result<TodoPage, TodoError> {
        let filter = filter.cloned().unwrap_or_default();
        let pagination = pagination.copied().unwrap_or_default();

        if !self.options.cache_enabled {
            return self.load_page(owner, filter, &pagination).await;
        }

        let key = derive_key(owner, &filter, &pagination);
        if let Some(page) = self.read_cached(&key).await {
            counter!(METRIC_CACHE_HIT).increment(1);
            debug!(key = %key, result = "hit", "Served todo list from cache");
            return Ok(page);
        }
        counter!(METRIC_CACHE_MISS).increment(1);

        let page = self.load_page(owner, filter, &pagination).await?;
        if page.total > 0 {
            self.write_cached(&key, &page).await;
        }
        Ok(page)
    }

    /// Point lookup scoped to `owner`; never cached.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn find_by_id(&self, owner: OwnerId, id: TodoId) -> Result<Option<Todo>, TodoError> {
        let criteria = TodoCriteria::owned_by(owner).with_id(id);
        let mut rows = self
            .store_call("query", self.store.query(&criteria, None, Some(1)))
            .await
            .map_err(|err| TodoError::from_store(None, err))?;

        Ok(rows.pop().map(Todo::from))
    }

    #[instrument(skip(self, todo), fields(owner = %todo.owner_id))]
    pub async fn create(&self, todo: NewTodo) -> Result<Todo, TodoError> {
        todo.validate()?;
        let owner = todo.owner_id;

        let record = self
            .store_call("insert", self.store.insert(CreateTodoParams::from(todo)))
            .await
            .map_err(|err| TodoError::from_store(None, err))?;

        self.invalidate(owner).await;
        Ok(record.into())
    }

    #[instrument(skip(self, changes), fields(owner = %owner))]
    pub async fn update(
        &self,
        owner: OwnerId,
        id: TodoId,
        changes: TodoChanges,
    ) -> Result<Todo, TodoError> {
        changes.validate()?;
        if self.find_by_id(owner, id).await?.is_none() {
            return Err(TodoError::NotFound { id });
        }

        let criteria = TodoCriteria::owned_by(owner);
        let record = self
            .store_call("update", self.store.update_by_id(id, &criteria, changes))
            .await
            .map_err(|err| TodoError::from_store(Some(id), err))?;

        self.invalidate(owner).await;
        Ok(record.into())
    }

    /// Mark the todo deleted. Later reads no longer see it.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn remove(&self, owner: OwnerId, id: TodoId) -> Result<(), TodoError> {
        if self.find_by_id(owner, id).await?.is_none() {
            return Err(TodoError::NotFound { id });
        }

        let criteria = TodoCriteria::owned_by(owner);
        self.store_call("delete", self.store.delete_by_id(id, &criteria))
            .await
            .map_err(|err| TodoError::from_store(Some(id), err))?;

        self.invalidate(owner).await;
        Ok(())
    }

    /// Drop every cached list of `owner`. Returns the number of entries removed,
    /// zero when the cache is disabled or could not be reached.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn invalidate(&self, owner: OwnerId) -> u64 {
        if !self.options.cache_enabled {
            return 0;
        }

        let namespace = owner_namespace(owner);
        match self
            .cache_call("delete_by_prefix", &namespace, self.cache.delete_by_prefix(&namespace))
            .await
        {
            Some(removed) => {
                counter!(METRIC_CACHE_INVALIDATE).increment(1);
                debug!(namespace = %namespace, removed, "Invalidated todo list cache");
                removed
            }
            None => 0,
        }
    }

    async fn load_page(
        &self,
        owner: OwnerId,
        filter: TodoFilter,
        pagination: &TodoPagination,
    ) -> Result<TodoPage, TodoError> {
        let criteria = TodoCriteria::owned_by(owner).with_filter(filter);
        let window = Window::from_pagination(pagination);

        let rows = self
            .store_call("query", self.store.query(&criteria, window.offset, window.limit))
            .await
            .map_err(|err| TodoError::from_store(None, err))?;
        let matching = self
            .store_call("count", self.store.count(&criteria))
            .await
            .map_err(|err| TodoError::from_store(None, err))?;

        Ok(TodoPage {
            total: page_count(matching, pagination.limit),
            data: rows.into_iter().map(Todo::from).collect(),
        })
    }

    async fn read_cached(&self, key: &str) -> Option<TodoPage> {
        if !self.cache_call("exists", key, self.cache.exists(key)).await? {
            return None;
        }

        let bytes = self.cache_call("get", key, self.cache.get(key)).await??;
        match serde_json::from_slice::<TodoPage>(&bytes) {
            Ok(page) => Some(page),
            Err(err) => {
                counter!(METRIC_CACHE_DECODE_ERROR).increment(1);
                warn!(
                    key = %key,
                    error = %err,
                    result = "evicted",
                    "Cached todo list could not be decoded"
                );
                self.cache_call("delete", key, self.cache.delete(key)).await;
                None
            }
        }
    }

    async fn write_cached(&self, key: &str, page: &TodoPage) {
        let bytes = match serde_json::to_vec(page) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(key = %key, error = %err, "Failed to encode todo list for cache");
                return;
            }
        };

        self.cache_call("set", key, self.cache.set(key, bytes, self.options.ttl))
            .await;
    }

    /// Run a cache call under the cache timeout; any failure becomes `None`.
    async fn cache_call<T>(
        &self,
        op: &'static str,
        key: &str,
        call: impl Future<Output = Result<T, CacheError>>,
    ) -> Option<T> {
        let err = match tokio::time::timeout(self.options.cache_timeout, call).await {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(err)) => err,
            Err(_) => CacheError::Timeout { op },
        };

        counter!(METRIC_CACHE_ERROR, "op" => op).increment(1);
        warn!(op, key = %key, error = %err, result = "fail_open", "Todo cache call failed");
        None
    }

    /// Run a store call under the store timeout and record its latency.
    async fn store_call<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = Result<T, RepoError>>,
    ) -> Result<T, RepoError> {
        let started_at = Instant::now();
        let result = tokio::time::timeout(self.options.store_timeout, call)
            .await
            .unwrap_or(Err(RepoError::Timeout));

        histogram!(METRIC_STORE_QUERY_MS, "op" => op)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);
        result
    }
}
