//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::arguments::ToolArguments;
use super::response::ToolResponse;
use super::schema::ToolSchema;
use super::transform::{ArgumentTransformer, ArgumentValidator};
use crate::agent::Agent;
use crate::agent_loop::RunContext;
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// Core tool trait. Implement to create custom tools.
///
/// One instance serves every call; per-call state belongs in `handle`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema for the arguments.
    fn parameters(&self) -> &ToolSchema;

    /// Leave unset optional fields out of the validated arguments.
    fn partial(&self) -> bool {
        false
    }

    fn validators(&self) -> &[Arc<dyn ArgumentValidator>] {
        &[]
    }

    fn transformers(&self) -> &[Arc<dyn ArgumentTransformer>] {
        &[]
    }

    /// Agent this tool hands the conversation to, for hand-off tools.
    fn handoff_target(&self) -> Option<Arc<Agent>> {
        None
    }

    /// Execute the tool with validated arguments.
    async fn handle(&self, args: ToolArguments, ctx: &RunContext) -> Result<ToolResponse, ToolError>;

    /// Definition sent to the model.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters().render(),
            strict: false,
        }
    }
}

type ToolHandler = dyn Fn(ToolArguments, RunContext) -> BoxFuture<'static, Result<ToolResponse, ToolError>>
    + Send
    + Sync;

/// Closure-based tool for quick tool creation.
pub struct FnTool {
    name: String,
    description: String,
    parameters: ToolSchema,
    partial: bool,
    validators: Vec<Arc<dyn ArgumentValidator>>,
    transformers: Vec<Arc<dyn ArgumentTransformer>>,
    handler: Arc<ToolHandler>,
}

impl FnTool {
    /// Create a tool from a closure.
    ///
    /// The closure may return anything convertible into a [`ToolResponse`]
    /// (strings, numbers, JSON values).
    pub fn new<F, Fut, R>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, RunContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ToolError>> + Send + 'static,
        R: Into<ToolResponse> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            partial: false,
            validators: Vec::new(),
            transformers: Vec::new(),
            handler: Arc::new(
                move |args: ToolArguments,
                      ctx: RunContext|
                      -> BoxFuture<'static, Result<ToolResponse, ToolError>> {
                    let fut = handler(args, ctx);
                    Box::pin(async move { fut.await.map(Into::into) })
                },
            ),
        }
    }

    pub fn with_partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    pub fn with_validator(mut self, validator: impl ArgumentValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn with_transformer(mut self, transformer: impl ArgumentTransformer + 'static) -> Self {
        self.transformers.push(Arc::new(transformer));
        self
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolSchema {
        &self.parameters
    }

    fn partial(&self) -> bool {
        self.partial
    }

    fn validators(&self) -> &[Arc<dyn ArgumentValidator>] {
        &self.validators
    }

    fn transformers(&self) -> &[Arc<dyn ArgumentTransformer>] {
        &self.transformers
    }

    async fn handle(&self, args: ToolArguments, ctx: &RunContext) -> Result<ToolResponse, ToolError> {
        (self.handler)(args, ctx.clone()).await
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("partial", &self.partial)
            .finish()
    }
}
