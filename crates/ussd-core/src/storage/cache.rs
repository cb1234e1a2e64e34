//! Key-value cache trait.
//!
//! Defines the interface for the TTL cache that holds session state between
//! requests. Implementations live in this crate (`memory`) and in ussd-infra
//! (SQLite).

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use ussd_types::error::StoreError;

/// Trait for a TTL key-value cache of JSON values.
///
/// Each call is one round trip with no cross-key transaction. Uses RPITIT
/// (native async fn in traits, Rust 2024 edition).
pub trait CacheStore: Send + Sync {
    /// Get a live value. Expired or absent keys return `None`.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<serde_json::Value>, StoreError>> + Send;

    /// Set a value (upsert), resetting its time-to-live.
    fn set(
        &self,
        key: &str,
        value: &serde_json::Value,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Object-safe version of [`CacheStore`] with boxed futures.
pub trait CacheStoreDyn: Send + Sync {
    fn get_boxed<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<serde_json::Value>, StoreError>> + Send + 'a>>;

    fn set_boxed<'a>(
        &'a self,
        key: &'a str,
        value: &'a serde_json::Value,
        ttl: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;
}

/// Blanket implementation: any `CacheStore` automatically implements `CacheStoreDyn`.
impl<T: CacheStore> CacheStoreDyn for T {
    fn get_boxed<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<serde_json::Value>, StoreError>> + Send + 'a>>
    {
        Box::pin(self.get(key))
    }

    fn set_boxed<'a>(
        &'a self,
        key: &'a str,
        value: &'a serde_json::Value,
        ttl: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(self.set(key, value, ttl))
    }
}

/// Type-erased cache for runtime backend selection (memory vs SQLite).
pub struct BoxCacheStore {
    inner: Box<dyn CacheStoreDyn>,
}

impl BoxCacheStore {
    /// Wrap a concrete `CacheStore` in a type-erased box.
    pub fn new<T: CacheStore + 'static>(store: T) -> Self {
        Self {
            inner: Box::new(store),
        }
    }
}

impl CacheStore for BoxCacheStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        self.inner.get_boxed(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: &serde_json::Value,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.inner.set_boxed(key, value, ttl).await
    }
}
