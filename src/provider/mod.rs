//! Model transport trait and implementations.

pub mod accumulator;
pub mod http;

#[cfg(feature = "openai")]
pub mod openai_responses;

pub use accumulator::ResponseAccumulator;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::config::StrandConfig;
use crate::error::StrandError;
use crate::types::{Item, ModelResponse, OutputFormat, ReasoningEffort, StreamEvent, Truncation};

/// A request sent to the model service.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub model: String,
    pub instructions: String,
    pub input: Vec<Item>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: Option<f64>,
    pub text_format: OutputFormat,
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Hint for server-side prompt caching.
    pub prompt_cache_key: Option<String>,
    /// Ask the service to persist the response.
    pub store: bool,
    pub truncation: Truncation,
    /// End-user identifier.
    pub user: Option<String>,
}

impl ModelRequest {
    pub fn new(model: impl Into<String>, instructions: impl Into<String>, input: Vec<Item>) -> Self {
        Self {
            model: model.into(),
            instructions: instructions.into(),
            input,
            tools: Vec::new(),
            temperature: None,
            text_format: OutputFormat::Text,
            reasoning_effort: None,
            prompt_cache_key: None,
            store: false,
            truncation: Truncation::Auto,
            user: None,
        }
    }
}

/// Tool definition sent to the model service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub strict: bool,
}

/// Ordered events of one streamed response.
pub type EventStream = BoxStream<'static, Result<StreamEvent, StrandError>>;

/// Connection to a model service.
///
/// A session creates one transport lazily and reuses it for every turn.
#[async_trait]
pub trait ModelTransport: Send + Sync {
    /// Transport name, for logs.
    fn name(&self) -> &str;

    /// Issue one request and wait for the full response.
    async fn create(&self, request: &ModelRequest) -> Result<ModelResponse, StrandError>;

    /// Open an event stream for one request.
    ///
    /// Fold the events with a [`ResponseAccumulator`] to obtain the final
    /// response.
    async fn stream(&self, request: &ModelRequest) -> Result<EventStream, StrandError>;
}

/// Builds a transport from config.
pub type TransportFactory =
    Arc<dyn Fn(&StrandConfig) -> Result<Arc<dyn ModelTransport>, StrandError> + Send + Sync>;

/// Create the built-in transport for the given config.
#[allow(unused_variables)]
pub fn create_transport(config: &StrandConfig) -> Result<Arc<dyn ModelTransport>, StrandError> {
    #[cfg(feature = "openai")]
    {
        Ok(Arc::new(openai_responses::OpenAiResponsesTransport::from_config(config)?))
    }
    #[cfg(not(feature = "openai"))]
    {
        Err(StrandError::Configuration(
            "no model transport available; enable the `openai` feature or inject one".into(),
        ))
    }
}

/// The factory sessions use unless one is injected.
pub fn default_transport_factory() -> TransportFactory {
    Arc::new(create_transport)
}
