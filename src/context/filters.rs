//! Pure filters over the input log.

use std::sync::Arc;

use crate::types::{ContentPart, Item};

/// A user-supplied filter applied to the log before budget selection.
pub type InputFilter = Arc<dyn Fn(Vec<Item>) -> Vec<Item> + Send + Sync>;

/// Drop server-side `id`/`status` metadata from every item.
pub fn strip_bookkeeping(items: Vec<Item>) -> Vec<Item> {
    items.iter().map(Item::without_bookkeeping).collect()
}

/// Remove file parts from messages. Messages left without content are dropped.
pub fn filter_files(items: Vec<Item>) -> Vec<Item> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Item::Message(mut message) => {
                message
                    .content
                    .retain(|part| !matches!(part, ContentPart::InputFile { .. }));
                (!message.content.is_empty()).then_some(Item::Message(message))
            }
            other => Some(other),
        })
        .collect()
}

/// Remove tool-call and tool-output records.
pub fn filter_function_calls(items: Vec<Item>) -> Vec<Item> {
    items
        .into_iter()
        .filter(|item| item.as_message().is_some())
        .collect()
}

/// Run user filters in order, then strip bookkeeping.
pub fn apply_filters(items: Vec<Item>, filters: &[InputFilter]) -> Vec<Item> {
    let filtered = filters.iter().fold(items, |items, filter| filter(items));
    strip_bookkeeping(filtered)
}
