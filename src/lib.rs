//! Strand: a multi-turn conversation engine for tool-calling language models.
//!
//! A [`Session`](agent::Session) drives an [`Agent`](agent::Agent) through
//! turns: it assembles budgeted history, calls the model, executes the tool
//! calls it asks for concurrently, feeds the results back and repeats until
//! the model answers without tools. Runs are lazy streams, either buffered
//! (one request per turn) or streaming (transport events forwarded live).
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use strand::prelude::*;
//!
//! # async fn example() -> strand::error::Result<()> {
//! let echo = FnTool::new(
//!     "echo",
//!     "Repeat the message back",
//!     ToolSchema::object().string("message", "Text to repeat", true).build(),
//!     |args, _ctx| async move { Ok::<_, ToolError>(args.get_str("message")?.to_string()) },
//! );
//! let agent = Agent::builder()
//!     .name("helper")
//!     .model("gpt-4.1-mini")
//!     .tool(Arc::new(echo))
//!     .build()?;
//!
//! let mut session = Session::builder(Arc::new(agent))
//!     .with_user_message("Say hi through the echo tool")
//!     .build()?;
//! let outcome = session.run_to_completion().await?;
//! println!("{}", outcome.final_text().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod agent_loop;
pub mod config;
pub mod context;
pub mod error;
pub mod prelude;
pub mod provider;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
