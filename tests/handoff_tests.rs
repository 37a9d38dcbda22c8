//! Agent hand-off through tool calls.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use common::*;
use strand::agent::handoff::HANDOFF_MESSAGE;
use strand::agent::{Agent, HandoffPipeline};
use strand::types::Item;

fn billing() -> Arc<Agent> {
    Arc::new(
        Agent::builder()
            .name("Billing")
            .instructions("You handle refunds.")
            .model("billing-model")
            .build()
            .unwrap(),
    )
}

fn triage(target: &Arc<Agent>) -> Arc<Agent> {
    agent("triage", vec![target.as_handoff_tool(), echo_tool()])
}

#[tokio::test]
async fn next_turn_runs_as_the_target_agent() {
    let billing = billing();
    let transport = ScriptedTransport::new();
    transport.push_turn(vec![call(
        "c1",
        "handoff_to_billing",
        json!({ "reason": "refund request" }),
    )]);
    transport.push_turn(vec![Item::assistant("Billing here, refund issued.")]);
    let mut session = session(triage(&billing), &transport)
        .with_user_message("I want my money back")
        .with_pipeline(HandoffPipeline)
        .build()
        .unwrap();

    let outcome = session.run_to_completion().await.unwrap();

    assert_eq!(session.agent().name(), "Billing");
    assert!(outputs(&outcome.items)[0].1.contains(HANDOFF_MESSAGE));

    let requests = transport.requests();
    assert_eq!(requests[0].instructions, "You are triage.");
    assert!(requests[0]
        .tools
        .iter()
        .any(|t| t.name == "handoff_to_billing"));
    assert_eq!(requests[1].instructions, "You handle refunds.");
    assert_eq!(requests[1].model, "billing-model");
    assert!(requests[1].tools.is_empty());
    assert_eq!(requests[1].prompt_cache_key, Some(billing.cache_key()));
    // the target sees the whole conversation, hand-off included
    assert_eq!(requests[1].input.len(), 3);
}

#[tokio::test]
async fn without_the_pipeline_the_agent_stays() {
    let billing = billing();
    let transport = ScriptedTransport::new();
    transport.push_turn(vec![call(
        "c1",
        "handoff_to_billing",
        json!({ "reason": "refund" }),
    )]);
    transport.push_turn(vec![Item::assistant("still triage")]);
    let mut session = session(triage(&billing), &transport)
        .with_user_message("refund please")
        .build()
        .unwrap();

    session.run_to_completion().await.unwrap();

    assert_eq!(session.agent().name(), "triage");
    assert_eq!(transport.requests()[1].instructions, "You are triage.");
}

#[tokio::test]
async fn ordinary_tool_calls_do_not_switch_agents() {
    let billing = billing();
    let transport = ScriptedTransport::new();
    transport.push_turn(vec![call("c1", "echo", json!({ "text": "hi" }))]);
    transport.push_turn(vec![Item::assistant("done")]);
    let mut session = session(triage(&billing), &transport)
        .with_user_message("echo hi")
        .with_pipeline(HandoffPipeline)
        .build()
        .unwrap();

    session.run_to_completion().await.unwrap();

    assert_eq!(session.agent().name(), "triage");
}
