//! Error types for Strand.

pub mod unified;

pub use unified::ErrorCategory;

use thiserror::Error;

/// Primary error type for all Strand operations.
#[derive(Error, Debug)]
pub enum StrandError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Max turns reached ({max_turns})")]
    MaxTurnsReached { max_turns: u32 },

    #[error("Streaming failed: {0}")]
    StreamingFailed(String),

    #[error("Model refused to answer: {0}")]
    Refusal(String),

    #[error("Invalid JSON response: {0}")]
    InvalidJsonResponse(String),

    #[error("Response does not match output schema: {0}")]
    InvalidSchemaResponse(String),

    #[error("Model returned no output")]
    EmptyResponse,

    #[error("Tool '{tool_name}' failed: {source}")]
    ToolHandler {
        tool_name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Hook error: {0}")]
    Hook(String),

    #[error("Context provider '{name}' failed: {message}")]
    ContextProvider { name: String, message: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Run canceled")]
    Canceled,
}

impl StrandError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a hook error.
    pub fn hook(message: impl Into<String>) -> Self {
        Self::Hook(message.into())
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Refusal(_) => ErrorCategory::ModelVisible,
            Self::MaxTurnsReached { .. }
            | Self::StreamingFailed(_)
            | Self::InvalidJsonResponse(_)
            | Self::InvalidSchemaResponse(_)
            | Self::EmptyResponse => ErrorCategory::TurnTerminal,
            Self::Configuration(_) | Self::Authentication(_) => ErrorCategory::Configuration,
            Self::Canceled => ErrorCategory::Canceled,
            _ => ErrorCategory::Fatal,
        }
    }

    /// Whether a caller may reasonably retry the run.
    ///
    /// The engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Network(_) | Self::StreamingFailed(_) => true,
            Self::Api { status, .. } => matches!(status, 429 | 500..=599),
            _ => false,
        }
    }
}

/// Failure raised by a tool handler.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Deliberate, model-visible failure. Becomes an error tool output.
    #[error("{0}")]
    Soft(String),

    /// Unexpected failure. Aborts the run.
    #[error("{0}")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ToolError {
    pub fn soft(message: impl Into<String>) -> Self {
        Self::Soft(message.into())
    }

    pub fn failed(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Failed(error.into())
    }
}

impl From<StrandError> for ToolError {
    fn from(error: StrandError) -> Self {
        Self::Failed(Box::new(error))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, StrandError>;
