//! Session: one conversation's mutable state.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use super::agent::Agent;
use crate::agent_loop::{RunHook, RunPipeline};
use crate::config::StrandConfig;
use crate::context::{CharEstimator, ContextProvider, InputFilter, TokenEstimator};
use crate::error::StrandError;
use crate::provider::{default_transport_factory, ModelTransport, TransportFactory};
use crate::types::{Item, ModelSettings, Usage};

/// A conversation: the active agent, the growing input log and everything a
/// turn needs to talk to the model.
///
/// Single owner; runs borrow it mutably, so only one run is active at a time.
pub struct Session {
    agent: Arc<Agent>,
    input: Vec<Item>,
    turn_count: u32,
    max_turns: u32,
    max_input_tokens: Option<usize>,
    settings: ModelSettings,
    base_model: String,
    context: Option<Arc<dyn Any + Send + Sync>>,
    context_providers: Vec<Arc<dyn ContextProvider>>,
    input_filters: Vec<InputFilter>,
    pipelines: Vec<Arc<dyn RunPipeline>>,
    hooks: Vec<Arc<dyn RunHook>>,
    user_id: Option<String>,
    prompt_cache_key: Option<String>,
    config: StrandConfig,
    transport: Option<Arc<dyn ModelTransport>>,
    transport_factory: TransportFactory,
    token_estimator: Arc<dyn TokenEstimator>,
    stream_idle_timeout: Option<Duration>,
    usage: Usage,
    answered_by: Option<Arc<Agent>>,
}

impl Session {
    pub fn builder(agent: Arc<Agent>) -> SessionBuilder {
        SessionBuilder::new(agent)
    }

    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    /// Agent in charge of the most recent model response; the current agent
    /// before any turn has run.
    pub fn answering_agent(&self) -> &Arc<Agent> {
        self.answered_by.as_ref().unwrap_or(&self.agent)
    }

    /// The full input log.
    pub fn input(&self) -> &[Item] {
        &self.input
    }

    /// Turns started so far.
    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    pub fn max_input_tokens(&self) -> Option<usize> {
        self.max_input_tokens
    }

    /// Session-level overrides of the agent's model parameters.
    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// Model for the next turn: session override, then the active agent's
    /// model, then the model resolved when the session was built.
    pub fn model(&self) -> &str {
        self.settings
            .model
            .as_deref()
            .or(self.agent.model())
            .unwrap_or(&self.base_model)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Cache-key hint sent with requests; defaults to the agent's identity hash.
    pub fn prompt_cache_key(&self) -> String {
        self.prompt_cache_key
            .clone()
            .unwrap_or_else(|| self.agent.cache_key())
    }

    pub fn config(&self) -> &StrandConfig {
        &self.config
    }

    pub fn stream_idle_timeout(&self) -> Option<Duration> {
        self.stream_idle_timeout
    }

    /// Token usage summed over every response so far.
    pub fn usage(&self) -> &Usage {
        &self.usage
    }

    /// The caller's context value, if it is a `T`.
    pub fn context<T: Any>(&self) -> Option<&T> {
        self.context.as_deref()?.downcast_ref::<T>()
    }

    /// Append a user message.
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.input.push(Item::user(text));
    }

    pub fn push(&mut self, item: Item) {
        self.input.push(item);
    }

    pub fn set_agent(&mut self, agent: Arc<Agent>) {
        self.agent = agent;
    }

    pub fn set_max_turns(&mut self, max_turns: u32) {
        self.max_turns = max_turns;
    }

    /// Start counting turns from zero again, keeping the log.
    pub fn reset_turns(&mut self) {
        self.turn_count = 0;
    }

    pub fn settings_mut(&mut self) -> &mut ModelSettings {
        &mut self.settings
    }

    pub(crate) fn extend_input(&mut self, items: Vec<Item>) {
        self.input.extend(items);
    }

    pub(crate) fn context_value(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.context.as_ref()
    }

    pub(crate) fn context_providers(&self) -> &[Arc<dyn ContextProvider>] {
        &self.context_providers
    }

    pub(crate) fn input_filters(&self) -> &[InputFilter] {
        &self.input_filters
    }

    pub(crate) fn pipelines(&self) -> &[Arc<dyn RunPipeline>] {
        &self.pipelines
    }

    pub(crate) fn hooks(&self) -> &[Arc<dyn RunHook>] {
        &self.hooks
    }

    pub(crate) fn token_estimator(&self) -> &dyn TokenEstimator {
        self.token_estimator.as_ref()
    }

    pub(crate) fn set_answering_agent(&mut self, agent: Arc<Agent>) {
        self.answered_by = Some(agent);
    }

    pub(crate) fn record_usage(&mut self, usage: &Usage) {
        self.usage.merge(usage);
    }

    /// Counts a new turn, or fails once the ceiling is reached.
    pub(crate) fn next_turn(&mut self) -> Result<u32, StrandError> {
        if self.turn_count >= self.max_turns {
            return Err(StrandError::MaxTurnsReached {
                max_turns: self.max_turns,
            });
        }
        self.turn_count += 1;
        Ok(self.turn_count)
    }

    /// The session's transport, created on first use.
    pub(crate) fn transport(&mut self) -> Result<Arc<dyn ModelTransport>, StrandError> {
        if let Some(transport) = &self.transport {
            return Ok(Arc::clone(transport));
        }
        let transport = (self.transport_factory)(&self.config)?;
        tracing::debug!(transport = transport.name(), "created model transport");
        self.transport = Some(Arc::clone(&transport));
        Ok(transport)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("agent", &self.agent.name())
            .field("model", &self.model())
            .field("input_len", &self.input.len())
            .field("turn_count", &self.turn_count)
            .field("max_turns", &self.max_turns)
            .field("max_input_tokens", &self.max_input_tokens)
            .field("pipelines", &self.pipelines.len())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Builder for [`Session`].
///
/// Unset limits come from the config's [`RunDefaults`](crate::config::RunDefaults).
pub struct SessionBuilder {
    agent: Arc<Agent>,
    input: Vec<Item>,
    max_turns: Option<u32>,
    max_input_tokens: Option<usize>,
    settings: ModelSettings,
    context: Option<Arc<dyn Any + Send + Sync>>,
    context_providers: Vec<Arc<dyn ContextProvider>>,
    input_filters: Vec<InputFilter>,
    pipelines: Vec<Arc<dyn RunPipeline>>,
    hooks: Vec<Arc<dyn RunHook>>,
    user_id: Option<String>,
    prompt_cache_key: Option<String>,
    config: Option<StrandConfig>,
    transport: Option<Arc<dyn ModelTransport>>,
    transport_factory: Option<TransportFactory>,
    token_estimator: Option<Arc<dyn TokenEstimator>>,
    stream_idle_timeout: Option<Duration>,
}

impl SessionBuilder {
    fn new(agent: Arc<Agent>) -> Self {
        Self {
            agent,
            input: Vec::new(),
            max_turns: None,
            max_input_tokens: None,
            settings: ModelSettings::default(),
            context: None,
            context_providers: Vec::new(),
            input_filters: Vec::new(),
            pipelines: Vec::new(),
            hooks: Vec::new(),
            user_id: None,
            prompt_cache_key: None,
            config: None,
            transport: None,
            transport_factory: None,
            token_estimator: None,
            stream_idle_timeout: None,
        }
    }

    /// Initial input log.
    pub fn with_input(mut self, input: Vec<Item>) -> Self {
        self.input = input;
        self
    }

    pub fn with_user_message(mut self, text: impl Into<String>) -> Self {
        self.input.push(Item::user(text));
        self
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    pub fn with_max_input_tokens(mut self, max_input_tokens: usize) -> Self {
        self.max_input_tokens = Some(max_input_tokens);
        self
    }

    /// Model override; wins over the agent's model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.settings.model = Some(model.into());
        self
    }

    pub fn with_settings(mut self, settings: ModelSettings) -> Self {
        self.settings.merge(&settings);
        self
    }

    /// Caller context, readable from every [`RunContext`](crate::agent_loop::RunContext).
    pub fn with_context<T: Any + Send + Sync>(mut self, context: T) -> Self {
        self.context = Some(Arc::new(context));
        self
    }

    pub fn with_context_provider(mut self, provider: impl ContextProvider + 'static) -> Self {
        self.context_providers.push(Arc::new(provider));
        self
    }

    pub fn with_input_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(Vec<Item>) -> Vec<Item> + Send + Sync + 'static,
    {
        self.input_filters.push(Arc::new(filter));
        self
    }

    pub fn with_pipeline(mut self, pipeline: impl RunPipeline + 'static) -> Self {
        self.pipelines.push(Arc::new(pipeline));
        self
    }

    pub fn with_hook(mut self, hook: impl RunHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_prompt_cache_key(mut self, key: impl Into<String>) -> Self {
        self.prompt_cache_key = Some(key.into());
        self
    }

    pub fn with_config(mut self, config: StrandConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use this transport instead of creating one from config.
    pub fn with_transport(mut self, transport: Arc<dyn ModelTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_transport_factory(mut self, factory: TransportFactory) -> Self {
        self.transport_factory = Some(factory);
        self
    }

    pub fn with_token_estimator(mut self, estimator: impl TokenEstimator + 'static) -> Self {
        self.token_estimator = Some(Arc::new(estimator));
        self
    }

    pub fn with_stream_idle_timeout(mut self, timeout: Duration) -> Self {
        self.stream_idle_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Session, StrandError> {
        let base_model = self
            .settings
            .model
            .clone()
            .or_else(|| self.agent.model().map(String::from))
            .ok_or_else(|| {
                StrandError::Configuration(
                    "no model: set one on the session or on the agent".into(),
                )
            })?;
        if let Some(t) = self.settings.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(StrandError::Configuration(format!(
                    "temperature must be between 0 and 2, got {t}"
                )));
            }
        }

        let config = self
            .config
            .unwrap_or_else(|| StrandConfig::global().clone());
        let defaults = config.defaults().clone();

        Ok(Session {
            agent: self.agent,
            input: self.input,
            turn_count: 0,
            max_turns: self.max_turns.unwrap_or(defaults.max_turns),
            max_input_tokens: self.max_input_tokens.or(defaults.max_input_tokens),
            settings: self.settings,
            base_model,
            context: self.context,
            context_providers: self.context_providers,
            input_filters: self.input_filters,
            pipelines: self.pipelines,
            hooks: self.hooks,
            user_id: self.user_id,
            prompt_cache_key: self.prompt_cache_key,
            transport: self.transport,
            transport_factory: self
                .transport_factory
                .unwrap_or_else(default_transport_factory),
            token_estimator: self
                .token_estimator
                .unwrap_or_else(|| Arc::new(CharEstimator)),
            stream_idle_timeout: self
                .stream_idle_timeout
                .or_else(|| defaults.stream_idle_timeout()),
            config,
            usage: Usage::default(),
            answered_by: None,
        })
    }
}
