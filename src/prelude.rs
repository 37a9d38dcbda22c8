//! Convenience re-exports for common use.

pub use crate::agent::{Agent, HandoffPipeline, OutputSchema, Session};
pub use crate::agent_loop::{
    RunContext, RunHook, RunItem, RunMode, RunOutcome, RunPipeline, SessionPatch,
};
pub use crate::config::StrandConfig;
pub use crate::context::{ContextProvider, StaticContext};
pub use crate::error::{Result, StrandError, ToolError};
pub use crate::provider::{ModelRequest, ModelTransport};
pub use crate::tools::{FnTool, Tool, ToolArguments, ToolResponse, ToolSchema};
pub use crate::types::{Item, ModelResponse, ModelSettings, ReasoningEffort, Role, StreamEvent, Usage};
pub use tokio_util::sync::CancellationToken;
