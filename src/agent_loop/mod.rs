//! Turn engine: run context, hooks and pipelines, buffered and streaming
//! runs, structured-output finalization.

pub mod context;
pub mod finalizer;
pub mod hooks;
pub mod runner;
pub mod types;

pub use context::RunContext;
pub use finalizer::{parse_structured_output, RunOutcome};
pub use hooks::{RunHook, RunPipeline, SessionPatch};
pub use runner::RunStream;
pub use types::{RunId, RunItem, RunMode};
