//! Agents, sessions and hand-off between agents.

#[allow(clippy::module_inception)]
pub mod agent;
pub mod handoff;
pub mod session;

pub use agent::{Agent, AgentBuilder, OutputSchema};
pub use handoff::{HandoffPipeline, HandoffTool};
pub use session::{Session, SessionBuilder};
