//! Final answers validated against an agent's output schema.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use common::*;
use strand::agent::{Agent, OutputSchema, Session};
use strand::agent_loop::{RunPipeline, SessionPatch};
use strand::error::StrandError;
use strand::types::{Item, ModelResponse, OutputFormat};

/// Tomorrow's forecast.
#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
struct Forecast {
    city: String,
    high: i64,
}

fn forecaster() -> Arc<Agent> {
    Arc::new(
        Agent::builder()
            .name("forecaster")
            .model(TEST_MODEL)
            .tool(echo_tool())
            .output_schema(OutputSchema::of::<Forecast>())
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn final_answer_deserializes_into_the_schema_type() {
    let transport = ScriptedTransport::new();
    transport.push_turn(vec![call("c1", "echo", json!({ "text": "Oslo" }))]);
    transport.push_turn(vec![Item::assistant(r#"{"city": "Oslo", "high": 3}"#)]);
    let mut session = session(forecaster(), &transport)
        .with_user_message("Weather in Oslo?")
        .build()
        .unwrap();

    let forecast: Forecast = session.run_to_completion_as().await.unwrap();

    assert_eq!(
        forecast,
        Forecast {
            city: "Oslo".into(),
            high: 3
        }
    );
    match &transport.requests()[0].text_format {
        OutputFormat::JsonSchema {
            name,
            description,
            strict,
            ..
        } => {
            assert_eq!(name, "forecast");
            assert_eq!(description.as_deref(), Some("Tomorrow's forecast."));
            assert!(*strict);
        }
        OutputFormat::Text => panic!("expected a json_schema directive"),
    }
}

#[tokio::test]
async fn outcome_carries_the_validated_value() {
    let transport = ScriptedTransport::new();
    transport.push_turn(vec![Item::assistant(r#"{"city": "Lima", "high": 21}"#)]);
    let mut session = session(forecaster(), &transport)
        .with_user_message("Lima?")
        .build()
        .unwrap();

    let outcome = session.run_to_completion().await.unwrap();

    assert_eq!(outcome.structured, Some(json!({ "city": "Lima", "high": 21 })));
}

#[tokio::test]
async fn refusal_is_a_distinct_error() {
    let transport = ScriptedTransport::new();
    transport.push_turn(vec![Item::refusal("I can't share that.")]);
    let mut session = session(forecaster(), &transport)
        .with_user_message("Secret forecast?")
        .build()
        .unwrap();

    let err = session.run_to_completion().await.unwrap_err();

    assert!(matches!(err, StrandError::Refusal(ref m) if m == "I can't share that."));
    // the refusal still reached the log
    assert_eq!(session.input().len(), 2);
}

#[tokio::test]
async fn unparseable_and_mismatched_answers_fail_differently() {
    async fn final_error(answer: &str) -> StrandError {
        let transport = ScriptedTransport::new();
        transport.push_turn(vec![Item::assistant(answer)]);
        let mut session = session(forecaster(), &transport)
            .with_user_message("Oslo?")
            .build()
            .unwrap();
        session.run_to_completion().await.unwrap_err()
    }

    let err = final_error("sunny, around 3 degrees").await;
    assert!(matches!(err, StrandError::InvalidJsonResponse(_)));

    let err = final_error(r#"{"city": "Oslo"}"#).await;
    assert!(matches!(err, StrandError::InvalidSchemaResponse(ref m) if m.contains("high")));
}

#[tokio::test]
async fn typed_completion_needs_a_schema() {
    let transport = ScriptedTransport::new();
    transport.push_turn(vec![Item::assistant(r#"{"city": "Oslo", "high": 3}"#)]);
    let mut session = session(agent("plain", vec![]), &transport)
        .with_user_message("Oslo?")
        .build()
        .unwrap();

    let err = session.run_to_completion_as::<Forecast>().await.unwrap_err();

    assert!(matches!(err, StrandError::Configuration(_)));
}

/// Hands the session to a plain agent once the model stops calling tools.
struct HandBack(Arc<Agent>);

#[async_trait]
impl RunPipeline for HandBack {
    async fn postflight(
        &self,
        _session: &Session,
        response: &ModelResponse,
    ) -> Result<SessionPatch, StrandError> {
        if response.function_calls().is_empty() {
            Ok(SessionPatch::new().switch_agent(Arc::clone(&self.0)))
        } else {
            Ok(SessionPatch::new())
        }
    }
}

#[tokio::test]
async fn answer_is_checked_against_the_agent_that_gave_it() {
    let transport = ScriptedTransport::new();
    transport.push_turn(vec![Item::assistant(r#"{"city": "Bergen", "high": 9}"#)]);
    let plain = agent("plain", vec![]);
    let mut session = session(forecaster(), &transport)
        .with_user_message("Bergen?")
        .with_pipeline(HandBack(Arc::clone(&plain)))
        .build()
        .unwrap();

    let outcome = session.run_to_completion().await.unwrap();

    assert_eq!(session.agent().name(), "plain");
    assert_eq!(session.answering_agent().name(), "forecaster");
    assert_eq!(outcome.structured, Some(json!({ "city": "Bergen", "high": 9 })));
}
