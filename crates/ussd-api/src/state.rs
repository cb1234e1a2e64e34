//! Application state wiring the engine to its infrastructure.
//!
//! The engine is generic over its cache and customer repository; AppState pins
//! them to the concrete infra implementations selected by configuration.

use std::sync::Arc;

use ussd_core::action::registry::ActionRegistry;
use ussd_core::engine::{EngineSettings, UssdEngine};
use ussd_core::storage::cache::BoxCacheStore;
use ussd_core::storage::memory::MemoryCacheStore;
use ussd_infra::config::{customer_key_path, data_dir, load_menu};
use ussd_infra::crypto::vault::VaultCrypto;
use ussd_infra::sqlite::cache::SqliteCacheStore;
use ussd_infra::sqlite::customer::SqliteCustomerRepository;
use ussd_infra::sqlite::pool::DatabasePool;
use ussd_types::config::{SessionBackend, UssdConfig};

/// The engine pinned to the infra implementations.
pub type ConcreteEngine = UssdEngine<BoxCacheStore, SqliteCustomerRepository>;

/// Shared application state used by the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ConcreteEngine>,
    pub config: Arc<UssdConfig>,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Connect to the database, load the menu and build the engine.
    pub async fn init(config: UssdConfig) -> anyhow::Result<Self> {
        let db_pool = open_database(&config).await?;
        let customers = customer_repository(&config, db_pool.clone())?;
        let cache = session_cache(&config, &db_pool).await?;

        let menu = load_menu(&config.menu).await?;
        let engine = UssdEngine::new(
            cache,
            customers,
            ActionRegistry::with_builtins(),
            menu,
            EngineSettings::from_config(&config),
        )?;

        Ok(Self {
            engine: Arc::new(engine),
            config: Arc::new(config),
            db_pool,
        })
    }
}

/// Open the configured database, creating the data directory when the
/// default location is used.
pub async fn open_database(config: &UssdConfig) -> anyhow::Result<DatabasePool> {
    if config.database.url.is_none() {
        tokio::fs::create_dir_all(data_dir()).await?;
    }
    Ok(DatabasePool::connect(&config.database).await?)
}

/// Customer repository with the resolved display-name key.
pub fn customer_repository(
    config: &UssdConfig,
    pool: DatabasePool,
) -> anyhow::Result<SqliteCustomerRepository> {
    let crypto = VaultCrypto::resolve(&customer_key_path(config))?;
    Ok(SqliteCustomerRepository::new(pool, crypto))
}

async fn session_cache(config: &UssdConfig, pool: &DatabasePool) -> anyhow::Result<BoxCacheStore> {
    let cache = match config.session.backend {
        SessionBackend::Memory => BoxCacheStore::new(MemoryCacheStore::new()),
        SessionBackend::Sqlite => {
            let store = SqliteCacheStore::new(pool.clone());
            let purged = store.purge_expired().await?;
            tracing::debug!(purged, "removed expired session rows");
            BoxCacheStore::new(store)
        }
    };
    tracing::info!(backend = ?config.session.backend, "session cache ready");
    Ok(cache)
}
