//! Model responses and streaming events.

use serde::{Deserialize, Serialize};

use super::item::{FunctionCall, Item};
use super::usage::Usage;

/// Finalized output of one model request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub output: Vec<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ModelResponse {
    pub fn new(output: Vec<Item>) -> Self {
        Self {
            id: None,
            output,
            usage: None,
        }
    }

    /// Tool calls requested in this response, in output order.
    pub fn function_calls(&self) -> Vec<&FunctionCall> {
        self.output.iter().filter_map(Item::as_function_call).collect()
    }

    /// Concatenated assistant text.
    pub fn output_text(&self) -> String {
        self.output.iter().filter_map(Item::text).collect()
    }
}

/// Incremental event received while a response is streamed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Created {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response_id: Option<String>,
    },
    OutputItemAdded {
        output_index: usize,
        item: Item,
    },
    OutputTextDelta {
        output_index: usize,
        delta: String,
    },
    OutputTextDone {
        output_index: usize,
        text: String,
    },
    RefusalDelta {
        output_index: usize,
        delta: String,
    },
    FunctionCallArgumentsDelta {
        output_index: usize,
        delta: String,
    },
    FunctionCallArgumentsDone {
        output_index: usize,
        arguments: String,
    },
    OutputItemDone {
        output_index: usize,
        item: Item,
    },
    Completed {
        response: ModelResponse,
    },
    /// Transport-level failure reported inside the stream.
    Failed {
        message: String,
    },
}

impl StreamEvent {
    /// Text fragment carried by this event, if any.
    pub fn text_delta(&self) -> Option<&str> {
        match self {
            Self::OutputTextDelta { delta, .. } => Some(delta),
            _ => None,
        }
    }
}
