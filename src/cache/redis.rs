//! Redis-backed cache client.
//!
//! Every stored key is also recorded in a per-namespace sorted set so a namespace
//! can be dropped without scanning the keyspace. Writes and namespace deletes run
//! as Lua scripts, which Redis executes without interleaving other commands.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, RedisError, Script};
use tracing::debug;

use super::client::{CacheClient, CacheError};

const INDEX_SUFFIX: &str = "__index";

// KEYS[1] = entry key, KEYS[2] = namespace index
// ARGV[1] = payload, ARGV[2] = ttl seconds
//
// The index is a sorted set scored by entry expiry; members already past their
// expiry are trimmed on every write.
const SET_SCRIPT: &str = r"
local now = tonumber(redis.call('TIME')[1])
local ttl = tonumber(ARGV[2])
redis.call('SET', KEYS[1], ARGV[1], 'EX', ttl)
redis.call('ZREMRANGEBYSCORE', KEYS[2], '-inf', now)
redis.call('ZADD', KEYS[2], now + ttl, KEYS[1])
local remaining = redis.call('TTL', KEYS[2])
if remaining < ttl then
    redis.call('EXPIRE', KEYS[2], ttl)
end
return 1
";

// KEYS[1] = namespace index
const DELETE_NAMESPACE_SCRIPT: &str = r"
local members = redis.call('ZRANGE', KEYS[1], 0, -1)
local removed = 0
for i = 1, #members, 500 do
    local last = math.min(i + 499, #members)
    removed = removed + redis.call('DEL', unpack(members, i, last))
end
redis.call('DEL', KEYS[1])
return removed
";

// KEYS[1] = entry key, KEYS[2] = namespace index
const DELETE_KEY_SCRIPT: &str = r"
redis.call('ZREM', KEYS[2], KEYS[1])
return redis.call('DEL', KEYS[1])
";

impl From<RedisError> for CacheError {
    fn from(err: RedisError) -> Self {
        CacheError::unavailable(err)
    }
}

#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        debug!(target = "todo_cache::cache::redis", "Connected to redis");
        Ok(Self { connection })
    }

    pub fn from_connection(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

/// Namespace of `key`: everything up to and including its last `:`.
fn namespace_of(key: &str) -> &str {
    key.rfind(':').map_or("", |pos| &key[..=pos])
}

fn index_key(namespace: &str) -> String {
    format!("{namespace}{INDEX_SUFFIX}")
}

#[async_trait]
impl CacheClient for RedisCache {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection.clone();
        let found: bool = redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        Ok(found)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let ttl_secs = ttl.as_secs().max(1);
        let _: i64 = Script::new(SET_SCRIPT)
            .key(key)
            .key(index_key(namespace_of(key)))
            .arg(value)
            .arg(ttl_secs)
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let _: i64 = Script::new(DELETE_KEY_SCRIPT)
            .key(key)
            .key(index_key(namespace_of(key)))
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Only namespace prefixes (ending in `:`) are supported; arbitrary prefixes
    /// would need a keyspace scan.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        if !prefix.ends_with(':') {
            return Err(CacheError::UnsupportedPrefix {
                prefix: prefix.to_string(),
            });
        }

        let mut conn = self.connection.clone();
        let removed: u64 = Script::new(DELETE_NAMESPACE_SCRIPT)
            .key(index_key(prefix))
            .invoke_async(&mut conn)
            .await?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_is_key_up_to_last_separator() {
        assert_eq!(namespace_of("todos:abc:deadbeef"), "todos:abc:");
        assert_eq!(namespace_of("plain"), "");
    }

    #[test]
    fn index_key_sits_in_its_namespace() {
        assert_eq!(index_key("todos:abc:"), "todos:abc:__index");
    }

    #[test]
    fn redis_errors_map_to_unavailable() {
        let err = RedisError::from((redis::ErrorKind::IoError, "connection refused"));
        assert!(matches!(CacheError::from(err), CacheError::Unavailable(_)));
    }

    #[tokio::test]
    #[ignore = "requires TODO_CACHE_TEST_REDIS_URL"]
    async fn namespace_delete_against_live_redis() {
        let url = std::env::var("TODO_CACHE_TEST_REDIS_URL").expect("redis url");
        let cache = RedisCache::connect(&url).await.expect("connect");
        let ttl = Duration::from_secs(30);

        cache.set("todos:live-a:1", b"1".to_vec(), ttl).await.expect("set");
        cache.set("todos:live-a:2", b"2".to_vec(), ttl).await.expect("set");
        cache.set("todos:live-b:1", b"3".to_vec(), ttl).await.expect("set");

        let removed = cache
            .delete_by_prefix("todos:live-a:")
            .await
            .expect("delete namespace");

        assert_eq!(removed, 2);
        assert!(!cache.exists("todos:live-a:1").await.expect("exists"));
        assert!(cache.exists("todos:live-b:1").await.expect("exists"));

        cache.delete("todos:live-b:1").await.expect("cleanup");
    }

    #[tokio::test]
    #[ignore = "requires TODO_CACHE_TEST_REDIS_URL"]
    async fn expired_members_leave_the_index_on_write() {
        let url = std::env::var("TODO_CACHE_TEST_REDIS_URL").expect("redis url");
        let cache = RedisCache::connect(&url).await.expect("connect");
        let namespace = "todos:live-trim:";

        cache
            .set("todos:live-trim:1", b"1".to_vec(), Duration::from_secs(1))
            .await
            .expect("set");
        tokio::time::sleep(Duration::from_millis(2_100)).await;
        cache
            .set("todos:live-trim:2", b"2".to_vec(), Duration::from_secs(30))
            .await
            .expect("set");

        let mut conn = cache.connection.clone();
        let members: u64 = redis::cmd("ZCARD")
            .arg(index_key(namespace))
            .query_async(&mut conn)
            .await
            .expect("zcard");
        assert_eq!(members, 1);

        assert_eq!(cache.delete_by_prefix(namespace).await.expect("cleanup"), 1);
    }
}
