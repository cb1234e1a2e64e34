//! Configuration and menu file loading.
//!
//! A missing or malformed service config falls back to defaults with a
//! warning. The step catalog and locale files are different: the service
//! cannot run without a valid menu, so their errors are returned.

use std::path::{Path, PathBuf};

use ussd_core::catalog::StepCatalog;
use ussd_core::localize::Localizer;
use ussd_core::menu::MenuDefinition;
use ussd_types::config::{MenuConfig, UssdConfig};
use ussd_types::error::CatalogError;

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "USSD_DATA_DIR";

/// Data directory: `USSD_DATA_DIR`, falling back to `~/.ussd`.
pub fn data_dir() -> PathBuf {
    std::env::var(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".ussd")
        })
}

/// Key file for customer names: configured path or `{data_dir}/customer.key`.
pub fn customer_key_path(config: &UssdConfig) -> PathBuf {
    config
        .crypto
        .key_file
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir().join("customer.key"))
}

/// Load the service configuration from `path`.
///
/// - If the file does not exist, returns [`UssdConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
pub async fn load_config(path: &Path) -> UssdConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config found at {}, using defaults", path.display());
            return UssdConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return UssdConfig::default();
        }
    };

    match toml::from_str::<UssdConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            UssdConfig::default()
        }
    }
}

/// Read and parse the step catalog and locales named in `menu`.
///
/// A missing locales file is allowed (built-in engine messages and literal
/// step text are used); a missing catalog is an error.
pub async fn load_menu(menu: &MenuConfig) -> Result<MenuDefinition, CatalogError> {
    let catalog_src = tokio::fs::read_to_string(&menu.catalog_path)
        .await
        .map_err(|e| CatalogError::Parse(format!("cannot read {}: {e}", menu.catalog_path)))?;
    let catalog = StepCatalog::from_toml(&catalog_src)?;

    let localizer = match tokio::fs::read_to_string(&menu.locales_path).await {
        Ok(src) => Localizer::from_toml(&src, &menu.default_language)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(
                "No locales found at {}, using step content as literal text",
                menu.locales_path
            );
            Localizer::empty(&menu.default_language)
        }
        Err(err) => {
            return Err(CatalogError::Parse(format!(
                "cannot read {}: {err}",
                menu.locales_path
            )));
        }
    };

    tracing::info!(
        steps = catalog.len(),
        languages = localizer.languages().count(),
        "menu loaded"
    );
    Ok(MenuDefinition::new(catalog, localizer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CATALOG: &str = r#"
[steps.home]
content = "menu.home"

[[steps.home.inputs]]
input = "1"
next_step = "bye"

[steps.bye]
content = "Bye."
is_end_session = true
"#;

    fn menu_config(dir: &Path) -> MenuConfig {
        MenuConfig {
            catalog_path: dir.join("catalog.toml").display().to_string(),
            locales_path: dir.join("locales.toml").display().to_string(),
            ..MenuConfig::default()
        }
    }

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("ussd.toml")).await;
        assert_eq!(config.session.ttl_secs, 120);
        assert_eq!(config.menu.max_message_length, 160);
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ussd.toml");
        tokio::fs::write(
            &path,
            r#"
[server]
port = 9090

[session]
ttl_secs = 60
backend = "sqlite"
"#,
        )
        .await
        .unwrap();

        let config = load_config(&path).await;
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.session.ttl_secs, 60);
        assert_eq!(config.menu.home_step, "home");
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ussd.toml");
        tokio::fs::write(&path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(&path).await;
        assert_eq!(config.server.port, 8080);
    }

    #[tokio::test]
    async fn load_menu_reads_catalog_and_locales() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("catalog.toml"), CATALOG)
            .await
            .unwrap();
        tokio::fs::write(
            tmp.path().join("locales.toml"),
            "[en]\n\"menu.home\" = \"1. Leave\"\n",
        )
        .await
        .unwrap();

        let menu = load_menu(&menu_config(tmp.path())).await.unwrap();
        assert_eq!(menu.catalog.step_ids(), vec!["bye", "home"]);
        assert_eq!(menu.localizer.resolve("menu.home", "en"), "1. Leave");
    }

    #[tokio::test]
    async fn load_menu_without_locales_uses_literals() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("catalog.toml"), CATALOG)
            .await
            .unwrap();

        let menu = load_menu(&menu_config(tmp.path())).await.unwrap();
        assert_eq!(menu.localizer.resolve("Bye.", "en"), "Bye.");
    }

    #[tokio::test]
    async fn load_menu_missing_catalog_fails() {
        let tmp = TempDir::new().unwrap();
        let err = load_menu(&menu_config(tmp.path())).await.unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[tokio::test]
    async fn load_menu_invalid_catalog_fails() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("catalog.toml"),
            "[steps.home]\ncontent = \"x\"\n[[steps.home.inputs]]\ninput = \"1\"\nnext_step = \"nowhere\"\n",
        )
        .await
        .unwrap();
        let err = load_menu(&menu_config(tmp.path())).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[test]
    fn customer_key_path_prefers_config() {
        let mut config = UssdConfig::default();
        config.crypto.key_file = Some("/etc/ussd/customer.key".to_string());
        assert_eq!(
            customer_key_path(&config),
            PathBuf::from("/etc/ussd/customer.key")
        );
    }
}
