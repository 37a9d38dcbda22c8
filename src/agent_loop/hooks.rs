//! Extension points around each model call.
//!
//! [`RunHook`]s observe; [`RunPipeline`]s may change the session. Pipelines
//! never get `&mut Session`: they return a [`SessionPatch`] and the engine
//! applies every patch, in registration order, once all of them finished.

use std::sync::Arc;

use async_trait::async_trait;

use super::context::RunContext;
use crate::agent::{Agent, Session};
use crate::error::StrandError;
use crate::types::{Item, ModelResponse, ReasoningEffort};

/// Side-effect-only callbacks fired at turn start and end.
#[async_trait]
pub trait RunHook: Send + Sync {
    /// Runs after history assembly, before the request is sent.
    async fn on_start(&self, _ctx: &RunContext) -> Result<(), StrandError> {
        Ok(())
    }

    /// Runs once the turn's response is final and appended.
    async fn on_end(&self, _ctx: &RunContext, _response: &ModelResponse) -> Result<(), StrandError> {
        Ok(())
    }
}

/// Callbacks that may reconfigure the session mid-run.
///
/// Preflight patches apply before the current turn's request is built.
/// Postflight patches apply after the response, so they shape the next turn.
#[async_trait]
pub trait RunPipeline: Send + Sync {
    async fn preflight(&self, _session: &Session) -> Result<SessionPatch, StrandError> {
        Ok(SessionPatch::new())
    }

    async fn postflight(
        &self,
        _session: &Session,
        _response: &ModelResponse,
    ) -> Result<SessionPatch, StrandError> {
        Ok(SessionPatch::new())
    }
}

/// Changes a pipeline asks the engine to make to the session.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    agent: Option<Arc<Agent>>,
    model: Option<String>,
    temperature: Option<f64>,
    reasoning_effort: Option<ReasoningEffort>,
    max_turns: Option<u32>,
    input: Vec<Item>,
}

impl SessionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand the conversation to another agent.
    pub fn switch_agent(mut self, agent: Arc<Agent>) -> Self {
        self.agent = Some(agent);
        self
    }

    pub fn set_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn set_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn set_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }

    pub fn set_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    /// Append an item to the session log.
    pub fn push_input(mut self, item: Item) -> Self {
        self.input.push(item);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.agent.is_none()
            && self.model.is_none()
            && self.temperature.is_none()
            && self.reasoning_effort.is_none()
            && self.max_turns.is_none()
            && self.input.is_empty()
    }

    pub(crate) fn apply_to(self, session: &mut Session) {
        if let Some(agent) = self.agent {
            tracing::debug!(from = session.agent().name(), to = agent.name(), "switching agent");
            session.set_agent(agent);
        }
        let settings = session.settings_mut();
        if self.model.is_some() {
            settings.model = self.model;
        }
        if self.temperature.is_some() {
            settings.temperature = self.temperature;
        }
        if self.reasoning_effort.is_some() {
            settings.reasoning_effort = self.reasoning_effort;
        }
        if let Some(max_turns) = self.max_turns {
            session.set_max_turns(max_turns);
        }
        session.extend_input(self.input);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_patch_reports_empty() {
        assert!(SessionPatch::new().is_empty());
        assert!(!SessionPatch::new().set_max_turns(3).is_empty());
    }
}
