//! Native tool-calling loop with scripted model replies.

mod common;

use serde_json::json;
use std::sync::Arc;

use concierge_core::config::NativeLoopConfig;
use concierge_core::mocks::MockLlm;
use concierge_core::{ComponentSpec, Error, Orchestrator, Stage, ToolCall, ToolName};

use common::{ask, concierge, concierge_with, config, studio_calendar};

#[tokio::test]
async fn test_tool_then_answer() {
    let llm = Arc::new(MockLlm::new(vec![
        MockLlm::tool_call("call-1", "search_services", json!({"query": "beginner pottery"})),
        MockLlm::text("not scores"),
        MockLlm::text("Pottery Basics is perfect for beginners: one hour of hand-building for $45."),
    ]));
    let engine = concierge(llm.clone());

    let response = engine
        .native
        .handle(ask("do you have pottery classes for beginners"))
        .await
        .unwrap();

    assert!(response.text.starts_with("Pottery Basics is perfect"));
    assert_eq!(response.function_to_call, Some(ToolName::SearchServices));
    assert_eq!(response.intent, "search_services");
    assert_eq!(llm.call_count(), 3);

    // Second loop turn carries the tool call and its slimmed result.
    let messages = llm.last_messages();
    let assistant = messages.iter().find(|m| m.tool_calls.is_some()).unwrap();
    assert_eq!(assistant.tool_calls.as_ref().unwrap()[0].id, "call-1");
    let tool_msg = messages.iter().find(|m| m.role == "tool").unwrap();
    assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call-1"));
    assert!(tool_msg.content.contains("Pottery Basics"));
    assert!(!tool_msg.content.contains("img.example"));

    // Every loop request exposes the full tool schema.
    assert!(llm.requests().iter().filter(|r| !r.json_mode).all(|r| r.tools.len() == 8));

    let debug = &response.debug;
    assert_eq!(debug.tool_calls.len(), 1);
    assert_eq!(debug.stage_total(Stage::Routing).input_tokens, 100);
    assert_eq!(debug.stage_total(Stage::Response).input_tokens, 100);
    assert_eq!(debug.stage_total(Stage::ToolExecution).input_tokens, 100);
}

#[tokio::test]
async fn test_plain_answer_without_tools() {
    let llm = Arc::new(MockLlm::constant("Hello! What can I help you with?"));
    let engine = concierge(llm.clone());

    let response = engine.native.handle(ask("hi")).await.unwrap();

    assert_eq!(response.intent, "conversation");
    assert_eq!(response.function_to_call, None);
    assert!(response.function_result.is_none());
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_iteration_cap_is_budget_exceeded() {
    let llm = Arc::new(MockLlm::new(vec![MockLlm::tool_call(
        "call-1",
        "get_store_info",
        json!({"topic": "hours"}),
    )]));
    let engine = concierge(llm.clone());

    let err = engine.native.handle(ask("when are you open?")).await.unwrap_err();

    assert!(matches!(err, Error::BudgetExceeded { used: 5, limit: 5 }));
    assert_eq!(llm.call_count(), 5);
}

#[tokio::test]
async fn test_configured_cap() {
    let llm = Arc::new(MockLlm::new(vec![MockLlm::tool_call(
        "call-1",
        "get_store_info",
        json!({}),
    )]));
    let mut config = config();
    config.native_loop = NativeLoopConfig { max_iterations: 2 };
    let engine = concierge_with(config, llm.clone(), Arc::new(studio_calendar()));

    let err = engine.native.handle(ask("tell me about the studio")).await.unwrap_err();

    assert_eq!(err.code(), "BUDGET_EXCEEDED");
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn test_verbatim_result_ends_loop() {
    let llm = Arc::new(MockLlm::new(vec![
        MockLlm::tool_call("call-1", "capture_lead", json!({"name": "Ana"})),
        MockLlm::text("should never be requested"),
    ]));
    let engine = concierge(llm.clone());

    let response = engine.native.handle(ask("please call me back")).await.unwrap();

    assert_eq!(llm.call_count(), 1);
    assert_eq!(response.function_to_call, Some(ToolName::CaptureLead));
    assert_eq!(
        Some(response.text.as_str()),
        response.function_result.as_ref().unwrap().message.as_deref()
    );
    assert!(matches!(response.ui_components[0], ComponentSpec::LeadForm { .. }));
}

#[tokio::test]
async fn test_unknown_tool_is_reported_back_to_model() {
    let llm = Arc::new(MockLlm::new(vec![
        MockLlm::tool_calls(vec![ToolCall {
            id: "call-1".into(),
            name: "get_weather".into(),
            arguments: json!({"city": "Porto"}),
        }]),
        MockLlm::text("I can't check the weather, but I can help with classes."),
    ]));
    let engine = concierge(llm.clone());

    let response = engine.native.handle(ask("what's the weather?")).await.unwrap();

    let tool_msg = llm.last_messages().into_iter().find(|m| m.role == "tool").unwrap();
    assert!(tool_msg.content.contains("unknown_tool"));
    assert_eq!(response.function_to_call, None);
    assert!(!response.debug.tool_calls[0].success);
}
