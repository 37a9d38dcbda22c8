//! Per-turn snapshot handed to hooks and tools.

use std::any::Any;
use std::sync::Arc;

use uuid::Uuid;

use super::types::RunId;
use crate::agent::Agent;
use crate::types::Item;

/// Point-in-time view of one turn.
///
/// Built fresh at the start of every turn from the session: the agent that
/// serves the turn, the turn number and ceiling, the exact input sent to the
/// model (plus the outputs appended during the turn) and the caller's
/// context value.
#[derive(Clone)]
pub struct RunContext {
    run_id: RunId,
    agent: Arc<Agent>,
    turn: u32,
    max_turns: u32,
    model: String,
    input: Vec<Item>,
    context: Option<Arc<dyn Any + Send + Sync>>,
}

impl RunContext {
    pub fn new(agent: Arc<Agent>, model: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            agent,
            turn: 0,
            max_turns: 0,
            model: model.into(),
            input: Vec::new(),
            context: None,
        }
    }

    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn with_turn(mut self, turn: u32, max_turns: u32) -> Self {
        self.turn = turn;
        self.max_turns = max_turns;
        self
    }

    pub fn with_input(mut self, input: Vec<Item>) -> Self {
        self.input = input;
        self
    }

    pub fn with_context<T: Any + Send + Sync>(self, context: T) -> Self {
        self.with_shared_context(Arc::new(context))
    }

    pub fn with_shared_context(mut self, context: Arc<dyn Any + Send + Sync>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn input(&self) -> &[Item] {
        &self.input
    }

    /// The caller's context value, if it is a `T`.
    pub fn context<T: Any>(&self) -> Option<&T> {
        self.context.as_deref()?.downcast_ref::<T>()
    }

    pub(crate) fn push(&mut self, item: Item) {
        self.input.push(item);
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.run_id)
            .field("agent", &self.agent.name())
            .field("turn", &self.turn)
            .field("max_turns", &self.max_turns)
            .field("model", &self.model)
            .field("input_len", &self.input.len())
            .field("has_context", &self.context.is_some())
            .finish()
    }
}
