//! `ussd catalog check`: verify menu files offline.

use anyhow::{Context, Result};
use console::style;

use ussd_core::action::registry::ActionRegistry;
use ussd_core::engine::EngineSettings;
use ussd_core::menu::MenuDefinition;
use ussd_infra::config::load_menu;
use ussd_types::config::UssdConfig;

/// Load the catalog and locales and run the same checks as server startup.
pub async fn check(config: &UssdConfig, json: bool) -> Result<()> {
    let menu = load_menu(&config.menu)
        .await
        .with_context(|| format!("Failed to load {}", config.menu.catalog_path))?;
    verify(&menu, config)?;

    let mut languages: Vec<&str> = menu.localizer.languages().collect();
    languages.sort_unstable();

    if json {
        let report = serde_json::json!({
            "valid": true,
            "steps": menu.catalog.step_ids(),
            "languages": languages,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        println!(
            "  {} Catalog {} is valid",
            style("✓").green().bold(),
            style(&config.menu.catalog_path).cyan()
        );
        println!("  {} steps, languages: {}", menu.catalog.len(), languages.join(", "));
        println!();
    }
    Ok(())
}

fn verify(menu: &MenuDefinition, config: &UssdConfig) -> Result<()> {
    let settings = EngineSettings::from_config(config);
    menu.verify(&ActionRegistry::with_builtins(), &settings.entry_steps())
        .context("Catalog failed verification")
}
