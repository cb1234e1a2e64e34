//! SQLite connection pools for customers and the shared session cache.
//!
//! Writes go through a single connection since SQLite serializes writers
//! anyway; reads use a separate read-only pool. WAL mode lets readers proceed
//! while a session row is being written.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use ussd_types::config::DatabaseConfig;

use crate::config::data_dir;

/// Reader/writer pool pair over one database file.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open the database described by `config`, falling back to
    /// [`default_database_url`] when no URL is set.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let url = config.url.clone().unwrap_or_else(default_database_url);
        Self::open(
            &url,
            config.max_readers,
            Duration::from_millis(config.busy_timeout_ms),
        )
        .await
    }

    /// Open `database_url` with default pool sizing.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let defaults = DatabaseConfig::default();
        Self::open(
            database_url,
            defaults.max_readers,
            Duration::from_millis(defaults.busy_timeout_ms),
        )
        .await
    }

    async fn open(
        database_url: &str,
        max_readers: u32,
        busy_timeout: Duration,
    ) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(busy_timeout)
            .create_if_missing(true);

        // Migrations need the writer; the read-only pool opens afterwards.
        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await?;
        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(max_readers.max(1))
            .connect_with(options.read_only(true))
            .await?;

        tracing::debug!(max_readers, "database pools open");
        Ok(Self { reader, writer })
    }

    /// Round trip on the read pool, for health checks.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.reader).await?;
        Ok(())
    }
}

/// `{data_dir}/ussd.db`
pub fn default_database_url() -> String {
    format!("sqlite://{}/ussd.db", data_dir().display())
}
