//! Error classification.

use serde::{Deserialize, Serialize};

/// Broad error category, used by callers to decide what to do with a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Fed back to the model or reported as an answer; the conversation can go on.
    ModelVisible,
    /// Ends the current run. The session stays usable.
    TurnTerminal,
    /// Propagated uncaught from a tool, hook or transport.
    Fatal,
    /// Invalid agent, tool or session setup, detected before any turn.
    Configuration,
    /// The caller canceled the run.
    Canceled,
}

impl ErrorCategory {
    /// Whether the session can keep running turns after this error.
    pub fn session_usable(self) -> bool {
        !matches!(self, Self::Configuration)
    }
}
