//! In-process TTL cache backed by `DashMap`.
//!
//! Values are cloned on read so no `DashMap` guard outlives a call. Expired
//! entries are invisible and removed lazily when read; there is no background
//! sweep.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use ussd_types::error::StoreError;

use super::cache::CacheStore;

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Instant,
}

/// Concurrent in-memory `CacheStore`.
///
/// Cloning produces a shared view of the same underlying data (backed by `Arc`).
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStore {
    inner: Arc<DashMap<String, Entry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Snapshot of all live keys, sorted.
    pub fn live_keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .inner
            .iter()
            .filter(|r| r.value().expires_at > now)
            .map(|r| r.key().clone())
            .collect();
        keys.sort();
        keys
    }
}

impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let now = Instant::now();
        let live = self
            .inner
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone());
        if live.is_none() {
            self.inner.remove_if(key, |_, entry| entry.expires_at <= now);
        }
        Ok(live)
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<(), StoreError> {
        self.inner.insert(
            key.to_string(),
            Entry {
                value: value.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}
