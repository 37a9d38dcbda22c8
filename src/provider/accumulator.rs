//! Rebuild a finalized response from streamed events.

use std::collections::BTreeMap;

use crate::error::StrandError;
use crate::types::{ContentPart, Item, ModelResponse, StreamEvent};

/// Folds stream events into the response they describe.
///
/// A `Completed` event carries the authoritative response; without one the
/// response is reconstructed from item and delta events.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    response_id: Option<String>,
    items: BTreeMap<usize, Item>,
    completed: Option<ModelResponse>,
}

impl ResponseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. A `Failed` event aborts with a streaming failure.
    pub fn apply(&mut self, event: &StreamEvent) -> Result<(), StrandError> {
        match event {
            StreamEvent::Created { response_id } => self.response_id.clone_from(response_id),
            StreamEvent::OutputItemAdded { output_index, item }
            | StreamEvent::OutputItemDone { output_index, item } => {
                self.items.insert(*output_index, item.clone());
            }
            StreamEvent::OutputTextDelta {
                output_index,
                delta,
            } => {
                if let Some(text) = self.text_part(*output_index) {
                    text.push_str(delta);
                }
            }
            StreamEvent::OutputTextDone { output_index, text } => {
                if let Some(current) = self.text_part(*output_index) {
                    current.clone_from(text);
                }
            }
            StreamEvent::RefusalDelta {
                output_index,
                delta,
            } => {
                if let Some(Item::Message(message)) = self.items.get_mut(output_index) {
                    match message.content.iter_mut().find_map(|part| match part {
                        ContentPart::Refusal { refusal } => Some(refusal),
                        _ => None,
                    }) {
                        Some(refusal) => refusal.push_str(delta),
                        None => message.content.push(ContentPart::Refusal {
                            refusal: delta.clone(),
                        }),
                    }
                }
            }
            StreamEvent::FunctionCallArgumentsDelta {
                output_index,
                delta,
            } => {
                if let Some(Item::FunctionCall(call)) = self.items.get_mut(output_index) {
                    call.arguments.push_str(delta);
                }
            }
            StreamEvent::FunctionCallArgumentsDone {
                output_index,
                arguments,
            } => {
                if let Some(Item::FunctionCall(call)) = self.items.get_mut(output_index) {
                    call.arguments.clone_from(arguments);
                }
            }
            StreamEvent::Completed { response } => self.completed = Some(response.clone()),
            StreamEvent::Failed { message } => {
                return Err(StrandError::StreamingFailed(message.clone()));
            }
        }
        Ok(())
    }

    /// Last output-text part of the message at `index`, created if missing.
    fn text_part(&mut self, index: usize) -> Option<&mut String> {
        let Some(Item::Message(message)) = self.items.get_mut(&index) else {
            return None;
        };
        if !matches!(message.content.last(), Some(ContentPart::OutputText { .. })) {
            message.content.push(ContentPart::OutputText {
                text: String::new(),
            });
        }
        match message.content.last_mut() {
            Some(ContentPart::OutputText { text }) => Some(text),
            _ => None,
        }
    }

    /// The finalized response.
    pub fn finish(self) -> Result<ModelResponse, StrandError> {
        if let Some(response) = self.completed {
            return Ok(response);
        }
        if self.items.is_empty() {
            return Err(StrandError::StreamingFailed(
                "stream closed before a response was produced".into(),
            ));
        }
        Ok(ModelResponse {
            id: self.response_id,
            output: self.items.into_values().collect(),
            usage: None,
        })
    }
}
