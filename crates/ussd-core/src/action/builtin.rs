//! Generic built-in actions and validations.
//!
//! Deployments register their business actions next to these; the builtins
//! cover greeting, capturing free-text input into the session's extra data,
//! and listing what was captured.

use serde_json::Value;
use ussd_types::error::ActionError;

use super::{Action, ActionContext, Validation};

/// Key used by `store_input` when the rule has no `value`.
const DEFAULT_INPUT_KEY: &str = "input";

/// Greets the identified customer by name.
pub struct GreetCustomer;

impl Action for GreetCustomer {
    fn name(&self) -> &str {
        "greet_customer"
    }

    async fn run(&self, ctx: &mut ActionContext) -> Result<String, ActionError> {
        Ok(match &ctx.customer {
            Some(customer) => format!("Welcome back, {}.", customer.display_name),
            None => "Welcome.".to_string(),
        })
    }
}

/// Saves the raw input into extra data under the rule's `value`.
pub struct StoreInput;

impl Action for StoreInput {
    fn name(&self) -> &str {
        "store_input"
    }

    async fn run(&self, ctx: &mut ActionContext) -> Result<String, ActionError> {
        let key = if ctx.value.trim().is_empty() {
            DEFAULT_INPUT_KEY.to_string()
        } else {
            ctx.value.trim().to_string()
        };
        let input = Value::String(ctx.input.clone());
        ctx.set_extra(key, input);
        Ok(String::new())
    }
}

/// Lists captured extra data, one `key: value` line per entry.
pub struct ListEntries;

impl Action for ListEntries {
    fn name(&self) -> &str {
        "list_entries"
    }

    async fn run(&self, ctx: &mut ActionContext) -> Result<String, ActionError> {
        let mut lines: Vec<String> = ctx
            .extra_entries()
            .map(|(key, value)| match value {
                Value::String(s) => format!("{key}: {s}"),
                other => format!("{key}: {other}"),
            })
            .collect();
        if lines.is_empty() {
            return Ok("No entries yet.".to_string());
        }
        lines.sort();
        Ok(lines.join("\n"))
    }
}

pub struct NonEmpty;

impl Validation for NonEmpty {
    fn name(&self) -> &str {
        "non_empty"
    }

    fn validate(&self, input: &str, _ctx: &ActionContext) -> bool {
        !input.trim().is_empty()
    }
}

pub struct Numeric;

impl Validation for Numeric {
    fn name(&self) -> &str {
        "numeric"
    }

    fn validate(&self, input: &str, _ctx: &ActionContext) -> bool {
        let input = input.trim();
        !input.is_empty() && input.chars().all(|c| c.is_ascii_digit())
    }
}
