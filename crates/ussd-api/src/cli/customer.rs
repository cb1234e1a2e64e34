//! `ussd customer add`: seed the customer table.

use anyhow::{Context, Result};
use console::style;

use ussd_core::repository::customer::CustomerRepository;
use ussd_infra::sqlite::customer::SqliteCustomerRepository;
use ussd_types::customer::NewCustomer;

/// Register a customer and print its id. The phone number is never echoed.
pub async fn add(repo: &SqliteCustomerRepository, customer: NewCustomer, json: bool) -> Result<()> {
    let created = repo
        .create(&customer)
        .await
        .context("Failed to register customer")?;

    if json {
        let out = serde_json::json!({
            "id": created.id,
            "network_operator": created.network_operator,
            "locale": created.locale,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        println!(
            "  {} Registered customer {}",
            style("✓").green().bold(),
            style(&created.id).cyan()
        );
        println!();
    }
    Ok(())
}
