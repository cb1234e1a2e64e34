//! Service configuration types.
//!
//! `UssdConfig` represents the top-level `ussd.toml`. Every field has a
//! default so an empty file (or no file) yields a working single-instance setup.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the USSD service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UssdConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub menu: MenuConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub crypto: CryptoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which cache backs the session store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// In-process map. Sessions are lost on restart.
    #[default]
    Memory,
    /// Shared SQLite table.
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Lifetime of a session record after its last write.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default)]
    pub backend: SessionBackend,
    /// Upper bound for a single cache round trip.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    /// How many visited steps are remembered for back navigation.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            backend: SessionBackend::default(),
            store_timeout_ms: default_store_timeout_ms(),
            max_history: default_max_history(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuConfig {
    /// Initial step for identified customers.
    #[serde(default = "default_home_step")]
    pub home_step: String,
    /// Initial step for unknown callers.
    #[serde(default = "default_onboarding_step")]
    pub onboarding_step: String,
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Maximum characters per reply.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    /// Input that requests the next page of a long reply.
    #[serde(default = "default_continuation_trigger")]
    pub continuation_trigger: String,
    /// Input that returns to the previous step where allowed.
    #[serde(default = "default_back_trigger")]
    pub back_trigger: String,
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
    #[serde(default = "default_locales_path")]
    pub locales_path: String,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            home_step: default_home_step(),
            onboarding_step: default_onboarding_step(),
            default_language: default_language(),
            max_message_length: default_max_message_length(),
            continuation_trigger: default_continuation_trigger(),
            back_trigger: default_back_trigger(),
            catalog_path: default_catalog_path(),
            locales_path: default_locales_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite URL. When absent the data directory default is used.
    #[serde(default)]
    pub url: Option<String>,
    /// Read connections. Writes always go through a single connection.
    #[serde(default = "default_max_readers")]
    pub max_readers: u32,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_readers: default_max_readers(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CryptoConfig {
    /// File holding the hex-encoded 32-byte key for customer names.
    #[serde(default)]
    pub key_file: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_ttl_secs() -> u64 {
    120
}

fn default_store_timeout_ms() -> u64 {
    2_000
}

fn default_max_history() -> usize {
    10
}

fn default_max_readers() -> u32 {
    8
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_home_step() -> String {
    "home".to_string()
}

fn default_onboarding_step() -> String {
    "onboarding".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_max_message_length() -> usize {
    160
}

fn default_continuation_trigger() -> String {
    "n".to_string()
}

fn default_back_trigger() -> String {
    "0".to_string()
}

fn default_catalog_path() -> String {
    "config/catalog.toml".to_string()
}

fn default_locales_path() -> String {
    "config/locales.toml".to_string()
}
