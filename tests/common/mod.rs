//! Shared test fixtures: a scripted model transport plus agent and tool helpers.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;

use strand::agent::{Agent, SessionBuilder};
use strand::config::StrandConfig;
use strand::error::{StrandError, ToolError};
use strand::provider::{EventStream, ModelRequest, ModelTransport};
use strand::tools::{FnTool, Tool, ToolSchema};
use strand::types::{ContentPart, Item, MessageItem, ModelResponse, Role, StreamEvent, Usage};

pub const TEST_MODEL: &str = "test-model";

enum Script {
    /// A whole response: returned by `create`, replayed as events by `stream`.
    Turn(ModelResponse),
    /// Raw events for `stream`; optionally never closes afterwards.
    Events { events: Vec<StreamEvent>, hang: bool },
    /// A request the model never answers.
    Silence,
}

/// Model transport that replays queued turns and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a turn answering with `output`.
    pub fn push_turn(&self, output: Vec<Item>) {
        self.push_response(ModelResponse::new(output));
    }

    pub fn push_response(&self, response: ModelResponse) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(Script::Turn(response));
    }

    /// Queue raw stream events that end the stream when exhausted.
    pub fn push_events(&self, events: Vec<StreamEvent>) {
        self.scripts.lock().unwrap().push_back(Script::Events {
            events,
            hang: false,
        });
    }

    /// Queue raw stream events, after which the stream stays open forever.
    pub fn push_events_then_hang(&self, events: Vec<StreamEvent>) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(Script::Events { events, hang: true });
    }

    /// Queue a turn whose request never gets an answer.
    pub fn push_silence(&self) {
        self.scripts.lock().unwrap().push_back(Script::Silence);
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_script(&self, request: &ModelRequest) -> Result<Script, StrandError> {
        self.requests.lock().unwrap().push(request.clone());
        self.scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| StrandError::Transport("script exhausted".into()))
    }
}

#[async_trait]
impl ModelTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn create(&self, request: &ModelRequest) -> Result<ModelResponse, StrandError> {
        match self.next_script(request)? {
            Script::Turn(response) => Ok(response),
            Script::Events { .. } => Err(StrandError::Transport(
                "scripted events can only be streamed".into(),
            )),
            Script::Silence => futures::future::pending().await,
        }
    }

    async fn stream(&self, request: &ModelRequest) -> Result<EventStream, StrandError> {
        let (events, hang) = match self.next_script(request)? {
            Script::Turn(response) => (events_for(&response), false),
            Script::Events { events, hang } => (events, hang),
            Script::Silence => (Vec::new(), true),
        };
        let replay = futures::stream::iter(events.into_iter().map(Ok));
        if hang {
            Ok(replay.chain(futures::stream::pending()).boxed())
        } else {
            Ok(replay.boxed())
        }
    }
}

/// The event sequence a streaming service would send for `response`.
pub fn events_for(response: &ModelResponse) -> Vec<StreamEvent> {
    let mut events = vec![StreamEvent::Created {
        response_id: response.id.clone(),
    }];
    for (output_index, item) in response.output.iter().enumerate() {
        match item {
            Item::Message(message) => {
                events.push(StreamEvent::OutputItemAdded {
                    output_index,
                    item: Item::Message(MessageItem {
                        content: Vec::new(),
                        ..message.clone()
                    }),
                });
                if let Some(text) = item.text() {
                    for word in text.split_inclusive(' ') {
                        events.push(StreamEvent::OutputTextDelta {
                            output_index,
                            delta: word.to_string(),
                        });
                    }
                }
            }
            Item::FunctionCall(call) => {
                let mut opened = call.clone();
                opened.arguments.clear();
                events.push(StreamEvent::OutputItemAdded {
                    output_index,
                    item: Item::FunctionCall(opened),
                });
                events.push(StreamEvent::FunctionCallArgumentsDelta {
                    output_index,
                    delta: call.arguments.clone(),
                });
            }
            Item::FunctionCallOutput(_) => {}
        }
        events.push(StreamEvent::OutputItemDone {
            output_index,
            item: item.clone(),
        });
    }
    events.push(StreamEvent::Completed {
        response: response.clone(),
    });
    events
}

pub fn empty_assistant() -> Item {
    Item::Message(MessageItem {
        id: None,
        role: Role::Assistant,
        content: Vec::<ContentPart>::new(),
        status: None,
    })
}

pub fn usage(input: u32, output: u32) -> Usage {
    Usage {
        input_tokens: input,
        output_tokens: output,
        total_tokens: input + output,
        cached_tokens: None,
        reasoning_tokens: None,
    }
}

pub fn agent(name: &str, tools: Vec<Arc<dyn Tool>>) -> Arc<Agent> {
    Arc::new(
        Agent::builder()
            .name(name)
            .instructions(format!("You are {name}."))
            .model(TEST_MODEL)
            .tools(tools)
            .build()
            .unwrap(),
    )
}

/// Session builder wired to `transport` with an empty config.
pub fn session(agent: Arc<Agent>, transport: &Arc<ScriptedTransport>) -> SessionBuilder {
    strand::agent::Session::builder(agent)
        .with_config(StrandConfig::new())
        .with_transport(Arc::clone(transport) as Arc<dyn ModelTransport>)
}

/// `echo(text)` returns its argument.
pub fn echo_tool() -> Arc<dyn Tool> {
    Arc::new(FnTool::new(
        "echo",
        "Echo the given text",
        ToolSchema::object().string("text", "Text to echo", true).build(),
        |args, _ctx| async move { Ok::<_, ToolError>(args.get_str("text")?.to_string()) },
    ))
}

/// `sleep(label, ms)` waits, records its label in `finished`, and returns it.
pub fn sleep_tool(finished: Arc<Mutex<Vec<String>>>) -> Arc<dyn Tool> {
    Arc::new(FnTool::new(
        "sleep",
        "Wait, then answer with the label",
        ToolSchema::object()
            .string("label", "Label", true)
            .integer("ms", "Delay in milliseconds", true)
            .build(),
        move |args, _ctx| {
            let finished = Arc::clone(&finished);
            async move {
                let label = args.get_str("label")?.to_string();
                let ms = args.get_i64("ms")?;
                tokio::time::sleep(Duration::from_millis(ms as u64)).await;
                finished.lock().unwrap().push(label.clone());
                Ok::<_, ToolError>(json!({ "label": label }))
            }
        },
    ))
}

/// Tool whose handler always fails unexpectedly.
pub fn failing_tool() -> Arc<dyn Tool> {
    Arc::new(FnTool::new(
        "explode",
        "Always fails",
        ToolSchema::empty(),
        |_args, _ctx| async move { Err::<String, _>(ToolError::failed("database unavailable")) },
    ))
}

pub fn call(call_id: &str, name: &str, arguments: serde_json::Value) -> Item {
    Item::function_call(call_id, name, arguments.to_string())
}

/// Call ids and outputs of every tool-output item, in order.
pub fn outputs(items: &[Item]) -> Vec<(String, String)> {
    items
        .iter()
        .filter_map(Item::as_function_call_output)
        .map(|o| (o.call_id.clone(), o.output.clone()))
        .collect()
}
