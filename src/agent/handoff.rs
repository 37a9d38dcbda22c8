//! Agent hand-off: a tool the model calls and a pipeline that acts on it.

use std::sync::Arc;

use async_trait::async_trait;

use super::agent::Agent;
use super::session::Session;
use crate::agent_loop::{RunContext, RunPipeline, SessionPatch};
use crate::error::{StrandError, ToolError};
use crate::tools::{Tool, ToolArguments, ToolResponse, ToolSchema};
use crate::types::ModelResponse;
use crate::util::text::to_snake_case;

pub const HANDOFF_MESSAGE: &str = "You have been handed this matter. Please, take over.";

/// Tool named `handoff_to_<agent>` that marks a hand-off to its target.
pub struct HandoffTool {
    name: String,
    description: String,
    parameters: ToolSchema,
    target: Arc<Agent>,
}

impl HandoffTool {
    pub fn new(target: Arc<Agent>) -> Self {
        Self {
            name: format!("handoff_to_{}", to_snake_case(target.name())),
            description: format!(
                "Proactively handoff the task to {} if relevant.",
                target.name()
            ),
            parameters: ToolSchema::object()
                .string("reason", "Brief reason for handoff. Max 50 characters.", true)
                .build(),
            target,
        }
    }
}

#[async_trait]
impl Tool for HandoffTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolSchema {
        &self.parameters
    }

    fn handoff_target(&self) -> Option<Arc<Agent>> {
        Some(Arc::clone(&self.target))
    }

    async fn handle(&self, args: ToolArguments, ctx: &RunContext) -> Result<ToolResponse, ToolError> {
        tracing::debug!(
            run_id = %ctx.run_id(),
            from = ctx.agent().name(),
            to = self.target.name(),
            reason = args.get_str_opt("reason").unwrap_or_default(),
            "hand-off requested"
        );
        Ok(ToolResponse::new(HANDOFF_MESSAGE))
    }
}

/// Postflight pipeline that switches the session's agent when the model
/// called one of the current agent's hand-off tools.
///
/// With several hand-off calls in one response, the last one wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandoffPipeline;

#[async_trait]
impl RunPipeline for HandoffPipeline {
    async fn postflight(
        &self,
        session: &Session,
        response: &ModelResponse,
    ) -> Result<SessionPatch, StrandError> {
        let target = response
            .function_calls()
            .into_iter()
            .filter_map(|call| session.agent().tools().get(&call.name))
            .filter_map(|tool| tool.handoff_target())
            .last();

        Ok(match target {
            Some(agent) => SessionPatch::new().switch_agent(agent),
            None => SessionPatch::new(),
        })
    }
}
