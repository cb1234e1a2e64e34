//! Typed session persistence over a `CacheStore`.
//!
//! Key scheme:
//! - primary record: `ussd:{session_id}`
//! - auxiliary item: `ussd:{session_id}-{item_key}` (e.g. `extra`)
//!
//! Both are JSON and share the same TTL, refreshed on every write. Every
//! round trip is bounded by a timeout and never retried here.

use std::future::Future;
use std::time::Duration;

use serde_json::{Map, Value};
use ussd_types::error::StoreError;
use ussd_types::session::Session;

use super::cache::CacheStore;

/// Auxiliary item holding action-owned per-session data.
pub const EXTRA_ITEM: &str = "extra";

/// Cache key of the primary session record.
pub fn session_key(session_id: &str) -> String {
    format!("ussd:{session_id}")
}

/// Cache key of an auxiliary per-session item.
pub fn item_key(session_id: &str, item: &str) -> String {
    format!("ussd:{session_id}-{item}")
}

/// Session Store Adapter.
pub struct SessionStore<C: CacheStore> {
    cache: C,
    ttl: Duration,
    op_timeout: Duration,
}

impl<C: CacheStore> SessionStore<C> {
    /// - `ttl`: lifetime of records after their last write
    /// - `op_timeout`: upper bound for one cache round trip
    pub fn new(cache: C, ttl: Duration, op_timeout: Duration) -> Self {
        Self {
            cache,
            ttl,
            op_timeout,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Load a session. `None` means "new session", not an error.
    pub async fn get(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        let key = session_key(session_id);
        match self.bounded(self.cache.get(&key)).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::Corrupt(format!("{key}: {e}"))),
            None => Ok(None),
        }
    }

    /// Persist a session, refreshing its TTL.
    pub async fn set(&self, session: &Session) -> Result<(), StoreError> {
        let key = session_key(&session.session_id);
        let value = serde_json::to_value(session)
            .map_err(|e| StoreError::Corrupt(format!("{key}: {e}")))?;
        self.bounded(self.cache.set(&key, &value, self.ttl)).await
    }

    /// Load an auxiliary JSON object. Absent or non-object values read as empty.
    pub async fn get_item(
        &self,
        session_id: &str,
        item: &str,
    ) -> Result<Map<String, Value>, StoreError> {
        let key = item_key(session_id, item);
        match self.bounded(self.cache.get(&key)).await? {
            Some(Value::Object(map)) => Ok(map),
            Some(_) => {
                tracing::warn!(key = %key, "auxiliary item is not an object; ignoring");
                Ok(Map::new())
            }
            None => Ok(Map::new()),
        }
    }

    /// Persist an auxiliary JSON object, refreshing its TTL.
    pub async fn set_item(
        &self,
        session_id: &str,
        item: &str,
        value: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let key = item_key(session_id, item);
        self.bounded(self.cache.set(&key, &Value::Object(value), self.ttl))
            .await
    }

    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .map_err(|_| StoreError::Timeout)?
    }
}
