//! OpenAI Responses transport against a mock HTTP server.

#![cfg(feature = "openai")]

mod common;

use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;
use strand::agent::Session;
use strand::config::StrandConfig;
use strand::error::StrandError;
use strand::provider::openai_responses::OpenAiResponsesTransport;
use strand::provider::{ModelRequest, ModelTransport, ResponseAccumulator};
use strand::types::{Item, StreamEvent};

fn transport(server: &MockServer) -> OpenAiResponsesTransport {
    OpenAiResponsesTransport::new("sk-test").with_base_url(server.uri())
}

fn request() -> ModelRequest {
    ModelRequest::new("gpt-4.1-mini", "Be brief.", vec![Item::user("Hi")])
}

fn sse(events: &[serde_json::Value]) -> String {
    events
        .iter()
        .map(|e| format!("event: {}\ndata: {e}\n\n", e["type"].as_str().unwrap_or("")))
        .collect()
}

#[tokio::test]
async fn create_posts_to_responses_and_parses_output() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4.1-mini",
            "instructions": "Be brief.",
            "stream": false,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "resp_1",
            "output": [
                { "type": "reasoning", "id": "rs_1", "summary": [] },
                {
                    "type": "message",
                    "id": "msg_1",
                    "role": "assistant",
                    "content": [{ "type": "output_text", "text": "Hello!", "annotations": [] }]
                }
            ],
            "usage": { "input_tokens": 12, "output_tokens": 3, "total_tokens": 15 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = transport(&server).create(&request()).await.unwrap();

    assert_eq!(response.id.as_deref(), Some("resp_1"));
    assert_eq!(response.output.len(), 1);
    assert_eq!(response.output_text(), "Hello!");
    assert_eq!(response.usage.unwrap().total_tokens, 15);
}

#[tokio::test]
async fn stream_decodes_server_sent_events() {
    let server = MockServer::start().await;
    let body = sse(&[
        json!({ "type": "response.created", "response": { "id": "resp_2" } }),
        json!({
            "type": "response.output_item.added",
            "output_index": 0,
            "item": { "type": "message", "id": "msg_1", "role": "assistant", "content": [] }
        }),
        json!({ "type": "response.output_text.delta", "output_index": 0, "delta": "Hel" }),
        json!({ "type": "response.output_text.delta", "output_index": 0, "delta": "lo" }),
        json!({
            "type": "response.completed",
            "response": {
                "id": "resp_2",
                "output": [{
                    "type": "message",
                    "id": "msg_1",
                    "role": "assistant",
                    "content": [{ "type": "output_text", "text": "Hello" }]
                }]
            }
        }),
    ]);
    Mock::given(method("POST"))
        .and(path("/responses"))
        .and(body_partial_json(json!({ "stream": true })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let events: Vec<StreamEvent> = transport(&server)
        .stream(&request())
        .await
        .unwrap()
        .map(|e| e.unwrap())
        .collect()
        .await;

    assert_eq!(events.len(), 5);
    assert_eq!(
        events[0],
        StreamEvent::Created {
            response_id: Some("resp_2".into())
        }
    );
    let deltas: String = events.iter().filter_map(StreamEvent::text_delta).collect();
    assert_eq!(deltas, "Hello");

    let mut accumulator = ResponseAccumulator::new();
    for event in &events {
        accumulator.apply(event).unwrap();
    }
    let response = accumulator.finish().unwrap();
    assert_eq!(response.output_text(), "Hello");
}

#[tokio::test]
async fn failed_stream_event_surfaces_the_service_message() {
    let server = MockServer::start().await;
    let body = sse(&[
        json!({ "type": "response.created", "response": { "id": "resp_3" } }),
        json!({
            "type": "response.failed",
            "response": { "id": "resp_3", "error": { "message": "model overloaded" } }
        }),
    ]);
    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let events: Vec<_> = transport(&server)
        .stream(&request())
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[1],
        Ok(StreamEvent::Failed { message }) if message == "model overloaded"
    ));
}

#[tokio::test]
async fn http_errors_map_to_typed_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided" }
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "slow down", "retry_after": 2 }
        })))
        .mount(&server)
        .await;

    let transport = transport(&server);

    let err = transport.create(&request()).await.unwrap_err();
    assert!(matches!(err, StrandError::Authentication(ref m) if m == "Incorrect API key provided"));

    let err = transport.create(&request()).await.unwrap_err();
    assert!(matches!(
        err,
        StrandError::RateLimited {
            retry_after_ms: Some(2000)
        }
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn session_builds_its_transport_from_config() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .and(header("authorization", "Bearer sk-config"))
        .and(body_partial_json(json!({ "model": TEST_MODEL, "user": "user-7" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "resp_4",
            "output": [{
                "type": "message",
                "role": "assistant",
                "content": [{ "type": "output_text", "text": "Configured." }]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = StrandConfig::new();
    config.set_api_key("openai", "sk-config".into());
    config.set_base_url("openai", server.uri());
    let mut session = Session::builder(agent("helper", vec![]))
        .with_config(config)
        .with_user_id("user-7")
        .with_user_message("Hi")
        .build()
        .unwrap();

    let outcome = session.run_to_completion().await.unwrap();

    assert_eq!(outcome.final_text().as_deref(), Some("Configured."));
}

#[tokio::test]
async fn missing_api_key_fails_on_first_turn() {
    let mut session = Session::builder(agent("helper", vec![]))
        .with_config(StrandConfig::new())
        .with_user_message("Hi")
        .build()
        .unwrap();

    let err = session.run_to_completion().await.unwrap_err();

    assert!(matches!(err, StrandError::Authentication(_)));
}
