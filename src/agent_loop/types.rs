//! Core run types for the turn engine.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Item, StreamEvent};

/// Unique run identifier.
pub type RunId = Uuid;

/// How each turn talks to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// One blocking request per turn.
    #[default]
    Buffered,
    /// Forward every transport event as it arrives.
    Streaming,
}

/// Element of a run's output sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RunItem {
    /// An item appended to the session log.
    Item(Item),
    /// A raw stream event (streaming mode only). Never appended to the log.
    Event(StreamEvent),
}

impl RunItem {
    pub fn as_item(&self) -> Option<&Item> {
        match self {
            Self::Item(item) => Some(item),
            Self::Event(_) => None,
        }
    }

    pub fn into_item(self) -> Option<Item> {
        match self {
            Self::Item(item) => Some(item),
            Self::Event(_) => None,
        }
    }

    /// Assistant text fragment, for live rendering.
    pub fn text_delta(&self) -> Option<&str> {
        match self {
            Self::Event(event) => event.text_delta(),
            Self::Item(_) => None,
        }
    }
}
