// src/cache/redis_backend.rs
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use log::debug;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::cache::backend::CacheBackend;

/// Keys fetched per SCAN round trip.
const SCAN_BATCH: usize = 500;

/// Shared Redis store.
///
/// One multiplexed connection is opened lazily and cloned into every operation.
/// It is dropped after any failed command, so the next call reconnects and a
/// restarted server is picked up without rebuilding the backend.
#[derive(Clone)]
pub struct RedisCacheBackend {
    client: redis::Client,
    shared: Arc<Mutex<Option<MultiplexedConnection>>>,
}

impl RedisCacheBackend {
    pub fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .with_context(|| format!("Invalid Redis URL: {}", url))?;
        Ok(Self {
            client,
            shared: Arc::new(Mutex::new(None)),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        let mut shared = self.shared.lock().await;
        if let Some(conn) = shared.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;
        debug!("Opened shared Redis connection");
        *shared = Some(conn.clone());
        Ok(conn)
    }

    async fn has_connection(&self) -> bool {
        self.shared.lock().await.is_some()
    }

    /// Run `op` on the shared connection, discarding it if the command fails.
    async fn with_connection<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let conn = self.connection().await?;
        let outcome = op(conn).await;
        if outcome.is_err() {
            self.shared.lock().await.take();
        }
        outcome
    }

    async fn scan_keys(&self, conn: &mut MultiplexedConnection, pattern: &str) -> Result<Vec<String>> {
        let mut cursor: u64 = 0;
        let mut found = Vec::new();
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut *conn)
                .await
                .context("Redis SCAN failed")?;
            found.extend(keys);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(found)
    }
}

impl CacheBackend for RedisCacheBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
        Box::pin(async move {
            self.with_connection(|mut conn| async move {
                let value: Option<Vec<u8>> = conn.get(key).await.context("Redis GET failed")?;
                anyhow::Ok(value)
            })
            .await
        })
    }

    fn get_many<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, Result<Vec<Option<Vec<u8>>>>> {
        Box::pin(async move {
            if keys.is_empty() {
                return Ok(Vec::new());
            }
            self.with_connection(|mut conn| async move {
                let values: Vec<Option<Vec<u8>>> = redis::cmd("MGET")
                    .arg(keys)
                    .query_async(&mut conn)
                    .await
                    .context("Redis MGET failed")?;
                anyhow::Ok(values)
            })
            .await
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: Vec<u8>, ttl_secs: u64) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.with_connection(|mut conn| async move {
                let _: () = conn
                    .set_ex(key, value, ttl_secs.max(1))
                    .await
                    .context("Redis SETEX failed")?;
                anyhow::Ok(())
            })
            .await
        })
    }

    fn set_many<'a>(&'a self, entries: Vec<(String, Vec<u8>)>, ttl_secs: u64) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if entries.is_empty() {
                return Ok(());
            }
            let mut pipe = redis::pipe();
            for (key, value) in &entries {
                pipe.set_ex(key, value.as_slice(), ttl_secs.max(1)).ignore();
            }
            self.with_connection(|mut conn| async move {
                let _: () = pipe
                    .query_async(&mut conn)
                    .await
                    .context("Redis pipelined SETEX failed")?;
                anyhow::Ok(())
            })
            .await?;
            debug!("Stored {} cache entries in one pipeline", entries.len());
            Ok(())
        })
    }

    fn delete_pattern<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, Result<usize>> {
        Box::pin(async move {
            self.with_connection(|mut conn| async move {
                let keys = self.scan_keys(&mut conn, pattern).await?;
                if keys.is_empty() {
                    return Ok(0);
                }
                let deleted: usize = conn.del(&keys).await.context("Redis DEL failed")?;
                anyhow::Ok(deleted)
            })
            .await
        })
    }

    fn count_keys<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, Result<usize>> {
        Box::pin(async move {
            self.with_connection(|mut conn| async move {
                anyhow::Ok(self.scan_keys(&mut conn, pattern).await?.len())
            })
            .await
        })
    }

    fn flush_all(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.with_connection(|mut conn| async move {
                let _: () = redis::cmd("FLUSHDB")
                    .query_async(&mut conn)
                    .await
                    .context("Redis FLUSHDB failed")?;
                anyhow::Ok(())
            })
            .await
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.with_connection(|mut conn| async move {
                let _: String = redis::cmd("PING")
                    .query_async(&mut conn)
                    .await
                    .context("Redis PING failed")?;
                anyhow::Ok(())
            })
            .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_malformed_url() {
        assert!(RedisCacheBackend::new("not a url").is_err());
        assert!(RedisCacheBackend::new("redis://127.0.0.1:6379").is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_server_leaves_no_shared_connection() {
        // Port 1 is never a Redis server, so connecting fails fast.
        let backend = RedisCacheBackend::new("redis://127.0.0.1:1").unwrap();
        assert!(backend.ping().await.is_err());
        assert!(!backend.has_connection().await);
        assert!(backend.get("fuzzy:match:missing").await.is_err());
        assert!(!backend.has_connection().await);
    }
}
