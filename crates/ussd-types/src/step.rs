//! Step catalog types.
//!
//! `StepConfig` / `InputConfig` mirror the authored `steps.<id>` configuration.
//! `Step` / `InputRule` are the resolved, validated shapes the engine uses.

use serde::{Deserialize, Serialize};

/// Content prefix marking "call this action to produce the text".
pub const ACTION_MARKER: &str = "action::";

/// One input rule as authored under `steps.<id>.inputs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Exact input that selects this rule. Empty means catch-all.
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub next_step: Option<String>,
    #[serde(default)]
    pub validation: Option<String>,
}

/// One step as authored under `steps.<id>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepConfig {
    pub content: String,
    #[serde(default)]
    pub allow_back: bool,
    #[serde(default)]
    pub is_end_session: bool,
    #[serde(default)]
    pub validation: Option<String>,
    #[serde(default)]
    pub inputs: Vec<InputConfig>,
}

/// What a step displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepContent {
    /// Localization key, or literal text when no translation exists.
    Template(String),
    /// Name of the action whose output is displayed.
    Action(String),
}

impl StepContent {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().strip_prefix(ACTION_MARKER) {
            Some(name) => StepContent::Action(name.trim().to_string()),
            None => StepContent::Template(raw.to_string()),
        }
    }
}

/// A resolved input rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRule {
    pub trigger: String,
    pub value: String,
    pub action_name: Option<String>,
    pub next_step_id: Option<String>,
    pub validation_name: Option<String>,
}

impl InputRule {
    /// Whether this is the catch-all rule.
    pub fn is_fallback(&self) -> bool {
        self.trigger.is_empty()
    }
}

impl From<InputConfig> for InputRule {
    fn from(c: InputConfig) -> Self {
        Self {
            trigger: c.input.trim().to_string(),
            value: c.value,
            action_name: non_blank(c.action),
            next_step_id: non_blank(c.next_step),
            validation_name: non_blank(c.validation),
        }
    }
}

/// A resolved menu step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub id: String,
    pub content: StepContent,
    pub allow_back: bool,
    pub is_end_session: bool,
    pub validation_name: Option<String>,
    pub inputs: Vec<InputRule>,
}

impl Step {
    pub fn from_config(id: impl Into<String>, config: StepConfig) -> Self {
        Self {
            id: id.into(),
            content: StepContent::parse(&config.content),
            allow_back: config.allow_back,
            is_end_session: config.is_end_session,
            validation_name: non_blank(config.validation),
            inputs: config.inputs.into_iter().map(InputRule::from).collect(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
