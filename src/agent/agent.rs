//! Agent definition: identity, instructions, model parameters and tools.

use std::sync::Arc;

use schemars::JsonSchema;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::handoff::HandoffTool;
use crate::error::StrandError;
use crate::tools::validation::{validate_arguments, ValidationMode, Violation};
use crate::tools::{render_definition, Tool, ToolRegistry};
use crate::types::{OutputFormat, ReasoningEffort};
use crate::util::text::to_snake_case;

pub const DEFAULT_AGENT_NAME: &str = "agent";
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful assistant.";

/// Configuration of one conversational agent.
///
/// Agents are immutable once built and shared as `Arc<Agent>`; a session
/// hands off by swapping which agent it points at.
#[derive(Clone)]
pub struct Agent {
    name: String,
    instructions: String,
    model: Option<String>,
    temperature: Option<f64>,
    reasoning_effort: Option<ReasoningEffort>,
    tools: ToolRegistry,
    output_schema: Option<OutputSchema>,
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::default()
    }

    /// Start a builder from this agent's settings.
    pub fn to_builder(&self) -> AgentBuilder {
        AgentBuilder {
            name: self.name.clone(),
            instructions: self.instructions.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            reasoning_effort: self.reasoning_effort,
            tools: self.tools.iter().cloned().collect(),
            output_schema: self.output_schema.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    pub fn reasoning_effort(&self) -> Option<ReasoningEffort> {
        self.reasoning_effort
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn output_schema(&self) -> Option<&OutputSchema> {
        self.output_schema.as_ref()
    }

    /// Prompt-cache hint: hex SHA-256 of name and instructions.
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.instructions.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }

    /// A tool that, when called, hands the conversation to this agent.
    ///
    /// Only takes effect in sessions running a [`HandoffPipeline`](super::HandoffPipeline).
    pub fn as_handoff_tool(self: &Arc<Self>) -> Arc<dyn Tool> {
        Arc::new(HandoffTool::new(Arc::clone(self)))
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("reasoning_effort", &self.reasoning_effort)
            .field("tools", &self.tools)
            .field("output_schema", &self.output_schema.as_ref().map(OutputSchema::name))
            .finish()
    }
}

/// Builder for [`Agent`]. Validation happens in [`build`](Self::build).
pub struct AgentBuilder {
    name: String,
    instructions: String,
    model: Option<String>,
    temperature: Option<f64>,
    reasoning_effort: Option<ReasoningEffort>,
    tools: Vec<Arc<dyn Tool>>,
    output_schema: Option<OutputSchema>,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self {
            name: DEFAULT_AGENT_NAME.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            model: None,
            temperature: None,
            reasoning_effort: None,
            tools: Vec::new(),
            output_schema: None,
        }
    }
}

impl AgentBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sampling temperature, 0 to 2. Reasoning models ignore it.
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn build(self) -> Result<Agent, StrandError> {
        if self.name.trim().is_empty() {
            return Err(StrandError::Configuration("agent name must not be empty".into()));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(StrandError::Configuration(format!(
                    "temperature must be between 0 and 2, got {t}"
                )));
            }
        }
        Ok(Agent {
            name: self.name,
            instructions: self.instructions,
            model: self.model,
            temperature: self.temperature,
            reasoning_effort: self.reasoning_effort,
            tools: ToolRegistry::new(self.tools)?,
            output_schema: self.output_schema,
        })
    }
}

/// Schema the agent's final answer must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    name: String,
    description: Option<String>,
    schema: Value,
}

impl OutputSchema {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            schema,
        }
    }

    /// Derive from a Rust type; named after the type in snake case, described
    /// by its doc comment.
    pub fn of<T: JsonSchema>() -> Self {
        let root = schemars::schema_for!(T);
        let schema = serde_json::to_value(root).unwrap_or(Value::Null);
        let description = schema
            .get("description")
            .and_then(Value::as_str)
            .map(String::from);
        Self {
            name: to_snake_case(&T::schema_name()),
            description,
            schema,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Strict JSON-schema directive for the request.
    pub fn to_output_format(&self) -> OutputFormat {
        OutputFormat::JsonSchema {
            name: self.name.clone(),
            description: self.description.clone(),
            schema: render_definition(&self.schema),
            strict: true,
        }
    }

    /// Check a parsed answer against the schema.
    pub fn validate(&self, value: &Value) -> Result<Value, Vec<Violation>> {
        validate_arguments(value, &self.schema, ValidationMode::Full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{FnTool, ToolSchema};
    use serde::Deserialize;
    use serde_json::json;

    /// A weather report.
    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct WeatherReport {
        city: String,
        celsius: f64,
    }

    #[test]
    fn defaults_match_a_plain_assistant() {
        let agent = Agent::builder().build().unwrap();
        assert_eq!(agent.name(), "agent");
        assert_eq!(agent.instructions(), "You are a helpful assistant.");
        assert!(agent.model().is_none());
        assert!(agent.tools().is_empty());
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        let err = Agent::builder().temperature(2.5).build().unwrap_err();
        assert!(matches!(err, StrandError::Configuration(_)));
    }

    #[test]
    fn rejects_duplicate_tools() {
        let tool = || -> Arc<dyn Tool> {
            Arc::new(FnTool::new("ping", "Ping", ToolSchema::empty(), |_a, _c| async {
                Ok::<_, crate::error::ToolError>("pong")
            }))
        };
        let err = Agent::builder().tool(tool()).tool(tool()).build().unwrap_err();
        assert!(err.to_string().contains("duplicate tool name 'ping'"));
    }

    #[test]
    fn cache_key_is_stable_per_identity() {
        let a = Agent::builder().name("billing").build().unwrap();
        let b = Agent::builder().name("billing").model("other").build().unwrap();
        let c = Agent::builder().name("support").build().unwrap();
        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
        assert_eq!(a.cache_key().len(), 64);
    }

    #[test]
    fn output_schema_from_type() {
        let schema = OutputSchema::of::<WeatherReport>();
        assert_eq!(schema.name(), "weather_report");
        assert_eq!(schema.description(), Some("A weather report."));

        let OutputFormat::JsonSchema { schema: rendered, strict, .. } = schema.to_output_format()
        else {
            panic!("expected a json_schema directive");
        };
        assert!(strict);
        assert_eq!(rendered["additionalProperties"], json!(false));
        assert!(rendered.get("title").is_none());

        assert!(schema.validate(&json!({ "city": "Oslo", "celsius": 3 })).is_ok());
        assert!(schema.validate(&json!({ "city": "Oslo" })).is_err());
    }
}
