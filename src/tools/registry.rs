//! Name-keyed tool lookup for an agent.

use std::collections::HashMap;
use std::sync::Arc;

use super::tool::Tool;
use crate::error::StrandError;
use crate::provider::ToolDefinition;

const MAX_TOOL_NAME_LEN: usize = 64;

fn is_valid_tool_name(name: &str) -> bool {
    (1..=MAX_TOOL_NAME_LEN).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// An agent's tools, checked once and indexed by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Build a registry, rejecting tools with missing metadata or clashing names.
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Result<Self, StrandError> {
        let mut index = HashMap::with_capacity(tools.len());
        for (position, tool) in tools.iter().enumerate() {
            let name = tool.name();
            if !is_valid_tool_name(name) {
                return Err(StrandError::Configuration(format!(
                    "invalid tool name {name:?}: use 1-64 letters, digits, '_' or '-'"
                )));
            }
            if tool.description().trim().is_empty() {
                return Err(StrandError::Configuration(format!(
                    "tool '{name}' has no description"
                )));
            }
            tool.parameters().check().map_err(|e| {
                StrandError::Configuration(format!("tool '{name}': {e}"))
            })?;
            if index.insert(name.to_string(), position).is_some() {
                return Err(StrandError::Configuration(format!(
                    "duplicate tool name '{name}'"
                )));
            }
        }
        Ok(Self { tools, index })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&position| &self.tools[position])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions sent to the model, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.tools.iter().map(|tool| tool.name()))
            .finish()
    }
}
