//! Step catalog parsing, validation, and lookup.
//!
//! Converts the authored `steps.<id>` TOML namespace into resolved `Step`
//! values and validates structural constraints up front, so a malformed
//! catalog fails at load time rather than in the middle of a caller's session.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use ussd_types::error::CatalogError;
use ussd_types::step::{Step, StepConfig, StepContent};

use crate::action::registry::ActionRegistry;

/// Shape of the catalog document.
#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    steps: BTreeMap<String, StepConfig>,
}

/// Read-only view of all menu steps.
#[derive(Debug, Clone, Default)]
pub struct StepCatalog {
    steps: HashMap<String, Step>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

impl StepCatalog {
    /// Parse a TOML document into a validated catalog.
    pub fn from_toml(content: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument =
            toml::from_str(content).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::from_configs(doc.steps)
    }

    /// Build a catalog from authored step configs.
    ///
    /// Ids are trimmed; two ids that trim to the same value are rejected.
    /// Runs `validate` after conversion, so the returned value is guaranteed
    /// to be structurally valid.
    pub fn from_configs(
        configs: impl IntoIterator<Item = (String, StepConfig)>,
    ) -> Result<Self, CatalogError> {
        let mut steps = HashMap::new();
        for (raw_id, config) in configs {
            let id = raw_id.trim().to_string();
            if steps.contains_key(&id) {
                return Err(CatalogError::Validation(format!(
                    "duplicate step id '{id}'"
                )));
            }
            steps.insert(id.clone(), Step::from_config(id, config));
        }
        let catalog = Self { steps };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Resolve a step by id.
    pub fn resolve(&self, step_id: &str) -> Result<&Step, CatalogError> {
        self.steps
            .get(step_id)
            .ok_or_else(|| CatalogError::NotFound(step_id.to_string()))
    }

    pub fn contains(&self, step_id: &str) -> bool {
        self.steps.contains_key(step_id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// All step ids, sorted.
    pub fn step_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.steps.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl StepCatalog {
    /// Validate structural constraints.
    ///
    /// Checks:
    /// - At least one step exists and no step id is blank
    /// - At most one empty-trigger (catch-all) rule per step
    /// - Every `next_step` points to an existing step
    /// - Every rule on a non-terminal step names a next step
    fn validate(&self) -> Result<(), CatalogError> {
        if self.steps.is_empty() {
            return Err(CatalogError::Validation(
                "catalog must define at least one step".to_string(),
            ));
        }

        for id in self.step_ids() {
            let step = &self.steps[id];
            if id.is_empty() {
                return Err(CatalogError::Validation("step id must not be empty".to_string()));
            }

            let fallbacks = step.inputs.iter().filter(|r| r.is_fallback()).count();
            if fallbacks > 1 {
                return Err(CatalogError::Validation(format!(
                    "step '{id}' has {fallbacks} catch-all inputs (at most one allowed)"
                )));
            }

            for rule in &step.inputs {
                match rule.next_step_id.as_deref() {
                    Some(next) if !self.steps.contains_key(next) => {
                        return Err(CatalogError::Validation(format!(
                            "step '{id}' input '{}' points to unknown step '{next}'",
                            rule.trigger
                        )));
                    }
                    None if !step.is_end_session => {
                        return Err(CatalogError::Validation(format!(
                            "step '{id}' input '{}' has no next_step and the step does not end the session",
                            rule.trigger
                        )));
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }

    /// Check that the named entry steps exist.
    pub fn require_steps(&self, step_ids: &[&str]) -> Result<(), CatalogError> {
        for id in step_ids {
            if !self.steps.contains_key(*id) {
                return Err(CatalogError::Validation(format!(
                    "required step '{id}' is missing from the catalog"
                )));
            }
        }
        Ok(())
    }

    /// Check every action and validation name against the registry.
    ///
    /// Covers rule actions, rule and step validations, and action-marker
    /// content.
    pub fn verify_references(&self, registry: &ActionRegistry) -> Result<(), CatalogError> {
        for id in self.step_ids() {
            let step = &self.steps[id];

            if let StepContent::Action(name) = &step.content {
                if !registry.contains_action(name) {
                    return Err(CatalogError::Validation(format!(
                        "step '{id}' content references unknown action '{name}'"
                    )));
                }
            }

            if let Some(name) = &step.validation_name {
                if !registry.contains_validation(name) {
                    return Err(CatalogError::Validation(format!(
                        "step '{id}' references unknown validation '{name}'"
                    )));
                }
            }

            for rule in &step.inputs {
                if let Some(name) = &rule.action_name {
                    if !registry.contains_action(name) {
                        return Err(CatalogError::Validation(format!(
                            "step '{id}' input '{}' references unknown action '{name}'",
                            rule.trigger
                        )));
                    }
                }
                if let Some(name) = &rule.validation_name {
                    if !registry.contains_validation(name) {
                        return Err(CatalogError::Validation(format!(
                            "step '{id}' input '{}' references unknown validation '{name}'",
                            rule.trigger
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
[steps.home]
content = "menu.home"
allow_back = false

[[steps.home.inputs]]
input = "1"
next_step = "entries"

[[steps.home.inputs]]
input = "2"
action = "store_input"
next_step = "done"

[steps.entries]
content = "action::list_entries"
allow_back = true

[[steps.entries.inputs]]
next_step = "home"

[steps.done]
content = "Thank you"
is_end_session = true
"#;

    #[test]
    fn test_parse_catalog() {
        let catalog = StepCatalog::from_toml(CATALOG).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.step_ids(), vec!["done", "entries", "home"]);

        let home = catalog.resolve("home").unwrap();
        assert_eq!(home.inputs.len(), 2);
        assert_eq!(home.inputs[1].action_name.as_deref(), Some("store_input"));

        let entries = catalog.resolve("entries").unwrap();
        assert_eq!(
            entries.content,
            StepContent::Action("list_entries".to_string())
        );
        assert!(entries.allow_back);
        assert!(catalog.resolve("done").unwrap().is_end_session);
    }

    #[test]
    fn test_ids_equal_after_trimming_are_duplicates() {
        let toml = "[steps.home]\ncontent = \"a\"\n\n[steps.\" home\"]\ncontent = \"b\"\n";
        let err = StepCatalog::from_toml(toml).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(msg) if msg.contains("duplicate step id 'home'")));
    }

    #[test]
    fn test_resolve_unknown_step() {
        let catalog = StepCatalog::from_toml(CATALOG).unwrap();
        let err = catalog.resolve("nope").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(id) if id == "nope"));
    }

    #[test]
    fn test_rejects_empty_catalog() {
        let err = StepCatalog::from_toml("").unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = StepCatalog::from_toml("[steps.home\ncontent = ").unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[test]
    fn test_rejects_missing_content() {
        let err = StepCatalog::from_toml("[steps.home]\nallow_back = true\n").unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[test]
    fn test_rejects_two_catch_all_rules() {
        let toml_str = r#"
[steps.home]
content = "x"
[[steps.home.inputs]]
next_step = "home"
[[steps.home.inputs]]
input = " "
next_step = "home"
"#;
        let err = StepCatalog::from_toml(toml_str).unwrap_err();
        assert!(err.to_string().contains("catch-all"));
    }

    #[test]
    fn test_rejects_dangling_next_step() {
        let toml_str = r#"
[steps.home]
content = "x"
[[steps.home.inputs]]
input = "1"
next_step = "ghost"
"#;
        let err = StepCatalog::from_toml(toml_str).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_rejects_missing_next_step_on_open_step() {
        let toml_str = r#"
[steps.home]
content = "x"
[[steps.home.inputs]]
input = "1"
"#;
        let err = StepCatalog::from_toml(toml_str).unwrap_err();
        assert!(err.to_string().contains("no next_step"));
    }

    #[test]
    fn test_terminal_step_rule_may_omit_next_step() {
        let toml_str = r#"
[steps.code]
content = "Enter code"
is_end_session = true
[[steps.code.inputs]]
action = "store_input"
"#;
        assert!(StepCatalog::from_toml(toml_str).is_ok());
    }

    #[test]
    fn test_require_steps() {
        let catalog = StepCatalog::from_toml(CATALOG).unwrap();
        assert!(catalog.require_steps(&["home", "done"]).is_ok());
        let err = catalog.require_steps(&["home", "onboarding"]).unwrap_err();
        assert!(err.to_string().contains("onboarding"));
    }

    #[test]
    fn test_verify_references_with_builtins() {
        let catalog = StepCatalog::from_toml(CATALOG).unwrap();
        let registry = ActionRegistry::with_builtins();
        assert!(catalog.verify_references(&registry).is_ok());
    }

    #[test]
    fn test_verify_references_unknown_action() {
        let toml_str = r#"
[steps.home]
content = "x"
[[steps.home.inputs]]
input = "1"
action = "redeem_prize"
next_step = "home"
"#;
        let catalog = StepCatalog::from_toml(toml_str).unwrap();
        let err = catalog
            .verify_references(&ActionRegistry::with_builtins())
            .unwrap_err();
        assert!(err.to_string().contains("redeem_prize"));
    }

    #[test]
    fn test_verify_references_unknown_content_action() {
        let toml_str = r#"
[steps.home]
content = "action::show_prizes"
"#;
        let catalog = StepCatalog::from_toml(toml_str).unwrap();
        let err = catalog
            .verify_references(&ActionRegistry::new())
            .unwrap_err();
        assert!(err.to_string().contains("show_prizes"));
    }

    #[test]
    fn test_verify_references_unknown_validation() {
        let toml_str = r#"
[steps.home]
content = "x"
validation = "is_palindrome"
"#;
        let catalog = StepCatalog::from_toml(toml_str).unwrap();
        let err = catalog
            .verify_references(&ActionRegistry::with_builtins())
            .unwrap_err();
        assert!(err.to_string().contains("is_palindrome"));
    }
}
