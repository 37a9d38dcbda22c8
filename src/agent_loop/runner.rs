//! The turn engine.
//!
//! A run is a lazy stream over one session. Each turn: check the turn
//! ceiling, run preflight pipelines, assemble history, fire start hooks,
//! call the model (blocking or streamed), append and yield its output, fire
//! end hooks, run postflight pipelines, then execute requested tool calls
//! concurrently and yield their outputs in call order. Turns repeat until a
//! response requests no tools.

use std::future::Future;
use std::sync::Arc;

use futures::future::try_join_all;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::context::RunContext;
use super::hooks::SessionPatch;
use super::types::{RunId, RunItem, RunMode};
use crate::agent::{Agent, OutputSchema, Session};
use crate::context::assemble_history;
use crate::error::StrandError;
use crate::provider::{ModelRequest, ResponseAccumulator};
use crate::tools::invoke_all;
use crate::types::{FunctionCall, Item, ModelResponse};
use crate::util::timeout::with_idle_timeout;

/// Output sequence of a run.
pub type RunStream<'a> = BoxStream<'a, Result<RunItem, StrandError>>;

/// Everything fixed at the start of a turn.
struct Turn {
    agent: Arc<Agent>,
    ctx: RunContext,
    request: ModelRequest,
}

impl Session {
    /// Run with one blocking model request per turn.
    pub fn run(&mut self) -> RunStream<'_> {
        self.run_with(RunMode::Buffered, CancellationToken::new())
    }

    /// Run with streamed model responses; raw events are yielded as
    /// [`RunItem::Event`] ahead of the finalized items.
    pub fn stream(&mut self) -> RunStream<'_> {
        self.run_with(RunMode::Streaming, CancellationToken::new())
    }

    /// Run in `mode` until a turn requests no tools.
    ///
    /// Cancelling `cancel` (or dropping the stream) stops at the current
    /// suspension point. Items appended before that stay in the log.
    pub fn run_with(&mut self, mode: RunMode, cancel: CancellationToken) -> RunStream<'_> {
        let run_id = Uuid::new_v4();
        Box::pin(async_stream::try_stream! {
            debug!(%run_id, agent = self.agent().name(), ?mode, "run start");
            loop {
                let Turn { agent, mut ctx, request } =
                    cancellable(&cancel, self.begin_turn(run_id)).await?;
                let transport = self.transport()?;

                let response = match mode {
                    RunMode::Buffered => cancellable(&cancel, transport.create(&request)).await?,
                    RunMode::Streaming => {
                        let mut events = cancellable(&cancel, transport.stream(&request)).await?;
                        let idle = self.stream_idle_timeout();
                        let mut accumulator = ResponseAccumulator::new();
                        loop {
                            let next = cancellable(&cancel, with_idle_timeout(idle, events.next())).await?;
                            let Some(event) = next else { break };
                            let event = event?;
                            let applied = accumulator.apply(&event);
                            yield RunItem::Event(event);
                            applied?;
                        }
                        accumulator.finish()?
                    }
                };

                self.set_answering_agent(Arc::clone(&agent));
                if let Some(usage) = &response.usage {
                    self.record_usage(usage);
                }
                for item in &response.output {
                    self.push(item.clone());
                    ctx.push(item.clone());
                    yield RunItem::Item(item.clone());
                }

                cancellable(&cancel, run_end_hooks(self, &ctx, &response)).await?;
                let patches = cancellable(&cancel, postflight(self, &response)).await?;
                for patch in patches {
                    patch.apply_to(self);
                }

                let calls: Vec<FunctionCall> =
                    response.function_calls().into_iter().cloned().collect();
                if calls.is_empty() {
                    debug!(%run_id, turn = ctx.turn(), "run complete");
                    break;
                }

                debug!(%run_id, turn = ctx.turn(), calls = calls.len(), "dispatching tool calls");
                let results = cancellable(&cancel, invoke_all(agent.tools(), &calls, &ctx)).await?;
                for (call, result) in calls.iter().zip(results) {
                    let output = Item::function_call_output(call.call_id.clone(), result.output_str());
                    self.push(output.clone());
                    yield RunItem::Item(output);
                    for extra in result.additional_inputs {
                        self.push(extra.clone());
                        yield RunItem::Item(extra);
                    }
                }
            }
        })
    }

    async fn begin_turn(&mut self, run_id: RunId) -> Result<Turn, StrandError> {
        let turn = match self.next_turn() {
            Ok(turn) => turn,
            Err(e) => {
                debug!(%run_id, max_turns = self.max_turns(), "turn ceiling reached");
                return Err(e);
            }
        };

        for patch in preflight(self).await? {
            patch.apply_to(self);
        }

        let agent = Arc::clone(self.agent());
        let model = self.model().to_string();
        let input = assemble_history(
            self.input(),
            self.input_filters(),
            self.max_input_tokens(),
            self.token_estimator(),
            self.context_providers(),
        )
        .await?;
        debug!(%run_id, turn, %model, agent = agent.name(), input_len = input.len(), "turn start");

        let mut ctx = RunContext::new(Arc::clone(&agent), model.clone())
            .with_run_id(run_id)
            .with_turn(turn, self.max_turns())
            .with_input(input.clone());
        if let Some(context) = self.context_value() {
            ctx = ctx.with_shared_context(Arc::clone(context));
        }

        try_join_all(self.hooks().iter().map(|hook| hook.on_start(&ctx))).await?;

        let request = self.build_request(&agent, model, input);
        Ok(Turn { agent, ctx, request })
    }

    fn build_request(&self, agent: &Agent, model: String, input: Vec<Item>) -> ModelRequest {
        let defaults = self.config().defaults();
        let settings = self.settings();
        ModelRequest {
            model,
            instructions: agent.instructions().to_string(),
            input,
            tools: agent.tools().definitions(),
            temperature: settings.temperature.or(agent.temperature()),
            text_format: agent
                .output_schema()
                .map(OutputSchema::to_output_format)
                .unwrap_or_default(),
            reasoning_effort: settings.reasoning_effort.or(agent.reasoning_effort()),
            prompt_cache_key: Some(self.prompt_cache_key()),
            store: settings.store.unwrap_or(defaults.store),
            truncation: settings.truncation.unwrap_or(defaults.truncation),
            user: self.user_id().map(String::from),
        }
    }
}

async fn preflight(session: &Session) -> Result<Vec<SessionPatch>, StrandError> {
    try_join_all(session.pipelines().iter().map(|p| p.preflight(session))).await
}

async fn postflight(
    session: &Session,
    response: &ModelResponse,
) -> Result<Vec<SessionPatch>, StrandError> {
    try_join_all(
        session
            .pipelines()
            .iter()
            .map(|p| p.postflight(session, response)),
    )
    .await
}

async fn run_end_hooks(
    session: &Session,
    ctx: &RunContext,
    response: &ModelResponse,
) -> Result<(), StrandError> {
    try_join_all(session.hooks().iter().map(|hook| hook.on_end(ctx, response))).await?;
    Ok(())
}

/// Await `future` unless `cancel` fires first.
async fn cancellable<T>(
    cancel: &CancellationToken,
    future: impl Future<Output = Result<T, StrandError>>,
) -> Result<T, StrandError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StrandError::Canceled),
        result = future => result,
    }
}
