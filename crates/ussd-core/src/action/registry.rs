//! Static action/validation registry.
//!
//! The registry is a bounded table built once at startup. Dispatch is a plain
//! map lookup; an unknown name is a typed `ActionError::UnknownAction`.
//!
//! Since `Action` uses RPITIT it cannot be a trait object directly, so it
//! follows the blanket-impl pattern:
//! 1. Define an object-safe `ActionDyn` trait with boxed futures
//! 2. Blanket-impl `ActionDyn` for all `T: Action`
//! 3. The registry stores `Box<dyn ActionDyn>`

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use ussd_types::error::ActionError;

use super::builtin;
use super::{Action, ActionContext, Validation};

/// Object-safe version of [`Action`] with a boxed future.
pub trait ActionDyn: Send + Sync {
    fn name(&self) -> &str;

    fn run_boxed<'a>(
        &'a self,
        ctx: &'a mut ActionContext,
    ) -> Pin<Box<dyn Future<Output = Result<String, ActionError>> + Send + 'a>>;
}

/// Blanket implementation: any `Action` automatically implements `ActionDyn`.
impl<T: Action> ActionDyn for T {
    fn name(&self) -> &str {
        Action::name(self)
    }

    fn run_boxed<'a>(
        &'a self,
        ctx: &'a mut ActionContext,
    ) -> Pin<Box<dyn Future<Output = Result<String, ActionError>> + Send + 'a>> {
        Box::pin(self.run(ctx))
    }
}

/// Name-keyed table of actions and validations.
#[derive(Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Box<dyn ActionDyn>>,
    validations: HashMap<String, Box<dyn Validation>>,
}

impl ActionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the generic built-in actions and validations.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_action(builtin::GreetCustomer);
        registry.register_action(builtin::StoreInput);
        registry.register_action(builtin::ListEntries);
        registry.register_validation(builtin::NonEmpty);
        registry.register_validation(builtin::Numeric);
        registry
    }

    /// Register an action under its own name, replacing any previous one.
    pub fn register_action<A: Action + 'static>(&mut self, action: A) -> &mut Self {
        let name = Action::name(&action).to_string();
        if self.actions.insert(name.clone(), Box::new(action)).is_some() {
            tracing::warn!(action = %name, "action registered twice; keeping the latest");
        }
        self
    }

    /// Register a validation under its own name, replacing any previous one.
    pub fn register_validation<V: Validation + 'static>(&mut self, validation: V) -> &mut Self {
        let name = validation.name().to_string();
        if self
            .validations
            .insert(name.clone(), Box::new(validation))
            .is_some()
        {
            tracing::warn!(validation = %name, "validation registered twice; keeping the latest");
        }
        self
    }

    pub fn contains_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn contains_validation(&self, name: &str) -> bool {
        self.validations.contains_key(name)
    }

    /// Registered action names, sorted.
    pub fn action_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run the named action.
    pub async fn invoke(
        &self,
        name: &str,
        ctx: &mut ActionContext,
    ) -> Result<String, ActionError> {
        let action = self
            .actions
            .get(name)
            .ok_or_else(|| ActionError::UnknownAction(name.to_string()))?;
        tracing::debug!(action = %action.name(), session_id = %ctx.session_id, "invoking action");
        action.run_boxed(ctx).await
    }

    /// Run the named validation and return its verdict.
    pub fn validate(
        &self,
        name: &str,
        input: &str,
        ctx: &ActionContext,
    ) -> Result<bool, ActionError> {
        let validation = self
            .validations
            .get(name)
            .ok_or_else(|| ActionError::UnknownAction(name.to_string()))?;
        Ok(validation.validate(input, ctx))
    }
}
