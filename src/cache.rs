// src/cache.rs
//! Key/value cache port used by the search read path, plus an in-process
//! adapter on top of `moka`. Values are JSON bytes; each entry carries its own TTL.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;
}

/// Typed read. A stored value that no longer decodes is reported as an error.
pub async fn get_json<T: DeserializeOwned>(cache: &dyn CacheStore, key: &str) -> Result<Option<T>> {
    match cache.get_raw(key).await? {
        Some(bytes) => {
            let v = serde_json::from_slice(&bytes)
                .with_context(|| format!("decode cached value for {key}"))?;
            Ok(Some(v))
        }
        None => Ok(None),
    }
}

pub async fn set_json<T: Serialize + ?Sized>(
    cache: &dyn CacheStore,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<()> {
    let bytes = serde_json::to_vec(value).with_context(|| format!("encode value for {key}"))?;
    cache.set_raw(key, bytes, ttl).await
}

#[derive(Clone)]
struct Entry {
    bytes: Arc<[u8]>,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Bounded in-process cache.
#[derive(Clone)]
pub struct MokaCacheStore {
    cache: Cache<String, Entry>,
}

impl MokaCacheStore {
    pub fn new(max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl CacheStore for MokaCacheStore {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.cache.get(key).await.map(|e| e.bytes.to_vec()))
    }

    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let entry = Entry {
            bytes: Arc::from(value),
            ttl,
        };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }
}
