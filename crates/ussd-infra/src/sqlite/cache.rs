//! SQLite-backed session cache.
//!
//! Implements `CacheStore` from `ussd-core` on the `ussd_cache` table so that
//! several service instances can share session state. Values are JSON text;
//! `expires_at` is epoch milliseconds. Expired rows are invisible to `get` and
//! deleted lazily when read.

use std::time::Duration;

use chrono::Utc;
use sqlx::Row;
use ussd_core::storage::cache::CacheStore;
use ussd_types::error::StoreError;

use super::pool::DatabasePool;

/// SQLite implementation of `CacheStore`.
pub struct SqliteCacheStore {
    pool: DatabasePool,
}

impl SqliteCacheStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Delete every expired row. Returns how many were removed.
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM ussd_cache WHERE expires_at <= ?")
            .bind(now_millis())
            .execute(&self.pool.writer)
            .await
            .map_err(unavailable)?;
        Ok(result.rows_affected())
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        let row = sqlx::query("SELECT value, expires_at FROM ussd_cache WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(unavailable)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: i64 = row.try_get("expires_at").map_err(unavailable)?;
        let now = now_millis();
        if expires_at <= now {
            sqlx::query("DELETE FROM ussd_cache WHERE key = ? AND expires_at <= ?")
                .bind(key)
                .bind(now)
                .execute(&self.pool.writer)
                .await
                .map_err(unavailable)?;
            return Ok(None);
        }

        let value_str: String = row.try_get("value").map_err(unavailable)?;
        serde_json::from_str(&value_str)
            .map(Some)
            .map_err(|e| StoreError::Corrupt(format!("{key}: {e}")))
    }

    async fn set(
        &self,
        key: &str,
        value: &serde_json::Value,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let value_str = serde_json::to_string(value)
            .map_err(|e| StoreError::Corrupt(format!("{key}: {e}")))?;
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now_millis().saturating_add(ttl_ms);

        sqlx::query(
            r#"INSERT INTO ussd_cache (key, value, expires_at)
               VALUES (?, ?, ?)
               ON CONFLICT (key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at"#,
        )
        .bind(key)
        .bind(&value_str)
        .bind(expires_at)
        .execute(&self.pool.writer)
        .await
        .map_err(unavailable)?;

        Ok(())
    }
}
