//! Conversation items: messages, tool calls and tool outputs.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Message author role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    Developer,
    User,
    Assistant,
}

/// Lifecycle status the model reports on output items.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    InProgress,
    Completed,
    Incomplete,
}

/// One part of a message body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText {
        text: String,
    },
    OutputText {
        text: String,
    },
    Refusal {
        refusal: String,
    },
    InputFile {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_data: Option<String>,
    },
}

impl ContentPart {
    /// Text carried by a text part (input or output).
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::InputText { text } | Self::OutputText { text } => Some(text),
            _ => None,
        }
    }
}

/// A user, system or assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: Role,
    pub content: Vec<ContentPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub call_id: String,
    pub name: String,
    /// Raw JSON argument payload, exactly as the model produced it.
    pub arguments: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
}

/// The result of a tool invocation, bound to its call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCallOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub call_id: String,
    pub output: String,
}

/// Entry in a session's input log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Item {
    Message(MessageItem),
    FunctionCall(FunctionCall),
    FunctionCallOutput(FunctionCallOutput),
}

impl Item {
    fn message(role: Role, content: Vec<ContentPart>) -> Self {
        Self::Message(MessageItem {
            id: None,
            role,
            content,
            status: None,
        })
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::message(Role::System, vec![ContentPart::InputText { text: text.into() }])
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::message(Role::User, vec![ContentPart::InputText { text: text.into() }])
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::message(
            Role::Assistant,
            vec![ContentPart::OutputText { text: text.into() }],
        )
    }

    pub fn refusal(text: impl Into<String>) -> Self {
        Self::message(
            Role::Assistant,
            vec![ContentPart::Refusal {
                refusal: text.into(),
            }],
        )
    }

    pub fn function_call(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self::FunctionCall(FunctionCall {
            id: None,
            call_id: call_id.into(),
            name: name.into(),
            arguments: arguments.into(),
            status: None,
        })
    }

    pub fn function_call_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::FunctionCallOutput(FunctionCallOutput {
            id: None,
            call_id: call_id.into(),
            output: output.into(),
        })
    }

    pub fn as_message(&self) -> Option<&MessageItem> {
        match self {
            Self::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn as_function_call(&self) -> Option<&FunctionCall> {
        match self {
            Self::FunctionCall(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_function_call_output(&self) -> Option<&FunctionCallOutput> {
        match self {
            Self::FunctionCallOutput(output) => Some(output),
            _ => None,
        }
    }

    /// Concatenated text of a message item.
    pub fn text(&self) -> Option<String> {
        let message = self.as_message()?;
        let parts: Vec<&str> = message.content.iter().filter_map(ContentPart::text).collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.concat())
        }
    }

    /// Refusal text, if this is an assistant refusal.
    pub fn refusal_text(&self) -> Option<&str> {
        self.as_message()?.content.iter().find_map(|part| match part {
            ContentPart::Refusal { refusal } => Some(refusal.as_str()),
            _ => None,
        })
    }

    /// Copy of this item without server-side `id`/`status` metadata.
    pub fn without_bookkeeping(&self) -> Self {
        match self {
            Self::Message(message) => Self::Message(MessageItem {
                id: None,
                status: None,
                ..message.clone()
            }),
            Self::FunctionCall(call) => Self::FunctionCall(FunctionCall {
                id: None,
                status: None,
                ..call.clone()
            }),
            Self::FunctionCallOutput(output) => Self::FunctionCallOutput(FunctionCallOutput {
                id: None,
                ..output.clone()
            }),
        }
    }
}
