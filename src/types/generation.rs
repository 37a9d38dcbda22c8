//! Model settings and request directives.

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Reasoning effort level for reasoning models.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReasoningEffort {
    Minimal,
    Low,
    Medium,
    High,
}

/// How the model service handles input that overflows its context window.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Truncation {
    #[default]
    Auto,
    Disabled,
}

/// Output-format directive sent with each request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    JsonSchema {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        schema: serde_json::Value,
        strict: bool,
    },
}

/// Session-level overrides for the active agent's model parameters.
///
/// Unset fields fall back to the agent, then to the session's config defaults.
#[derive(Debug, Clone, Default, Builder, Serialize, Deserialize, PartialEq)]
pub struct ModelSettings {
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub truncation: Option<Truncation>,
    pub store: Option<bool>,
}

impl ModelSettings {
    /// Overlay `other` on top of `self`; set fields in `other` win.
    pub fn merge(&mut self, other: &ModelSettings) {
        if other.model.is_some() {
            self.model.clone_from(&other.model);
        }
        if other.temperature.is_some() {
            self.temperature = other.temperature;
        }
        if other.reasoning_effort.is_some() {
            self.reasoning_effort = other.reasoning_effort;
        }
        if other.truncation.is_some() {
            self.truncation = other.truncation;
        }
        if other.store.is_some() {
            self.store = other.store;
        }
    }
}
