// src/cache/backend.rs
//! Storage seam for cached match results.
//!
//! Backends only move opaque byte values around; encoding, key derivation and
//! the degrade-on-failure policy live in [`CachedMatcher`](super::CachedMatcher).

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use regex::Regex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Key/value store with TTLs and wildcard deletion.
///
/// Patterns use `*` as a wildcard matching any run of characters.
pub trait CacheBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>>;

    /// One slot per requested key, in request order.
    fn get_many<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, Result<Vec<Option<Vec<u8>>>>>;

    fn set<'a>(&'a self, key: &'a str, value: Vec<u8>, ttl_secs: u64) -> BoxFuture<'a, Result<()>>;

    fn set_many<'a>(&'a self, entries: Vec<(String, Vec<u8>)>, ttl_secs: u64) -> BoxFuture<'a, Result<()>>;

    /// Delete every key matching `pattern`, returning how many were removed.
    fn delete_pattern<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, Result<usize>>;

    fn count_keys<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, Result<usize>>;

    /// Drop everything in the backing store, including keys written by others.
    fn flush_all(&self) -> BoxFuture<'_, Result<()>>;

    fn ping(&self) -> BoxFuture<'_, Result<()>>;
}

/// Translate a `*` wildcard pattern into an anchored regex.
pub(crate) fn wildcard_regex(pattern: &str) -> Result<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{}$", body))
        .with_context(|| format!("Invalid cache key pattern: {}", pattern))
}

/// Process-local backend, used for tests and single-node deployments without Redis.
#[derive(Default)]
pub struct InMemoryCacheBackend {
    entries: Mutex<HashMap<String, (Vec<u8>, Instant)>>,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn expiry(ttl_secs: u64) -> Instant {
        Instant::now() + Duration::from_secs(ttl_secs.max(1))
    }
}

impl CacheBackend for InMemoryCacheBackend {
    fn name(&self) -> &'static str {
        "in_memory"
    }

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
        Box::pin(async move {
            let mut entries = self.entries.lock().await;
            if let Some((value, expires_at)) = entries.get(key) {
                if *expires_at > Instant::now() {
                    return Ok(Some(value.clone()));
                }
            } else {
                return Ok(None);
            }
            entries.remove(key);
            Ok(None)
        })
    }

    fn get_many<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, Result<Vec<Option<Vec<u8>>>>> {
        Box::pin(async move {
            let now = Instant::now();
            let entries = self.entries.lock().await;
            Ok(keys
                .iter()
                .map(|key| match entries.get(key) {
                    Some((value, expires_at)) if *expires_at > now => Some(value.clone()),
                    _ => None,
                })
                .collect())
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: Vec<u8>, ttl_secs: u64) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.entries
                .lock()
                .await
                .insert(key.to_string(), (value, Self::expiry(ttl_secs)));
            Ok(())
        })
    }

    fn set_many<'a>(&'a self, entries: Vec<(String, Vec<u8>)>, ttl_secs: u64) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let expires_at = Self::expiry(ttl_secs);
            let mut stored = self.entries.lock().await;
            for (key, value) in entries {
                stored.insert(key, (value, expires_at));
            }
            Ok(())
        })
    }

    fn delete_pattern<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, Result<usize>> {
        Box::pin(async move {
            let matcher = wildcard_regex(pattern)?;
            let mut entries = self.entries.lock().await;
            let before = entries.len();
            entries.retain(|key, _| !matcher.is_match(key));
            Ok(before - entries.len())
        })
    }

    fn count_keys<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, Result<usize>> {
        Box::pin(async move {
            let matcher = wildcard_regex(pattern)?;
            let now = Instant::now();
            let entries = self.entries.lock().await;
            Ok(entries
                .iter()
                .filter(|(key, (_, expires_at))| *expires_at > now && matcher.is_match(key))
                .count())
        })
    }

    fn flush_all(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.entries.lock().await.clear();
            Ok(())
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}
