//! Named business actions and input validations.
//!
//! Actions produce reply text for a step (or end the session via
//! `ActionError::Rejected`). They never touch the primary session record;
//! the only state they may change is the session-scoped `extra` map carried
//! in their `ActionContext`, which the engine loads and persists around the call.

pub mod builtin;
pub mod registry;

use std::future::Future;

use serde_json::{Map, Value};
use ussd_types::error::ActionError;

/// Identified-customer data visible to actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerSnapshot {
    pub id: String,
    pub display_name: String,
}

/// Everything an action or validation may read about the current request.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub session_id: String,
    /// Active language of the session.
    pub language: String,
    /// Raw input of this request, trimmed.
    pub input: String,
    /// Caller phone number.
    pub phone: String,
    pub customer: Option<CustomerSnapshot>,
    /// Input of the previous request in this session.
    pub previous_input: Option<String>,
    pub network_operator: String,
    /// The matched rule's `value` (empty when rendering step content).
    pub value: String,
    extra: Map<String, Value>,
    extra_changed: bool,
}

impl ActionContext {
    pub fn new(session_id: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            language: language.into(),
            input: String::new(),
            phone: String::new(),
            customer: None,
            previous_input: None,
            network_operator: String::new(),
            value: String::new(),
            extra: Map::new(),
            extra_changed: false,
        }
    }

    /// Read a field from the session-scoped extra data.
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn extra_entries(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.extra.iter()
    }

    /// Write a field to the session-scoped extra data.
    pub fn set_extra(&mut self, key: impl Into<String>, value: Value) {
        self.extra.insert(key.into(), value);
        self.extra_changed = true;
    }

    /// Replace the extra data with what the store currently holds.
    pub fn load_extra(&mut self, extra: Map<String, Value>) {
        self.extra = extra;
        self.extra_changed = false;
    }

    /// The extra data, if an action modified it since it was loaded.
    pub fn take_changed_extra(&mut self) -> Option<Map<String, Value>> {
        if self.extra_changed {
            self.extra_changed = false;
            Some(std::mem::take(&mut self.extra))
        } else {
            None
        }
    }
}

/// A named business action.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition). Registered
/// once at startup in the `ActionRegistry`.
pub trait Action: Send + Sync {
    /// Registry key referenced by the catalog.
    fn name(&self) -> &str;

    /// Produce reply text. An empty string means "nothing to add".
    fn run(
        &self,
        ctx: &mut ActionContext,
    ) -> impl Future<Output = Result<String, ActionError>> + Send;
}

/// A named input validation.
///
/// The engine invokes validations for their side effects and logs the
/// outcome; it does not gate navigation on the result.
pub trait Validation: Send + Sync {
    fn name(&self) -> &str;

    fn validate(&self, input: &str, ctx: &ActionContext) -> bool;
}
