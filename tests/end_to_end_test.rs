//! A customer finds a slot, books it, and later leaves contact details,
//! across both orchestrators sharing one engine.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;
use std::sync::Arc;

use concierge_controller::{Concierge, ConciergeBuilder};
use concierge_core::config::{AppConfig, CacheStrategyKind};
use concierge_core::mocks::{MockCalendar, MockLlm, MockTabSource};
use concierge_core::{
    CalendarEvent, ComponentSpec, ConversationMessage, ConversationRequest, EventKind, Orchestrator, Stage,
    ToolName,
};

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn tabs() -> Arc<MockTabSource> {
    Arc::new(
        MockTabSource::new()
            .with_tab(
                "Services",
                &[],
                vec![json!({"ID": "svc-pottery", "Name": "Pottery Basics", "Category": "Pottery",
                            "Price": "45", "Duration": "60", "Capacity": "5"})],
            )
            .with_tab("Leads", &["Timestamp", "Name", "Email", "Interest"], vec![]),
    )
}

fn calendar() -> Arc<MockCalendar> {
    Arc::new(MockCalendar::with_events(vec![CalendarEvent {
        id: "w1".into(),
        summary: "Pottery Basics".into(),
        description: None,
        start: at(10, 9, 0),
        end: at(10, 17, 0),
        kind: EventKind::Availability,
        service_id: Some("svc-pottery".into()),
    }]))
}

fn engine(llm: Arc<MockLlm>, tabs: Arc<MockTabSource>, calendar: Arc<MockCalendar>) -> Concierge {
    let mut config = AppConfig::default();
    config.cache.strategy = CacheStrategyKind::Memory;
    ConciergeBuilder::new(config)
        .with_llm(llm)
        .with_tab_source(tabs)
        .with_calendar(calendar)
        .with_fixed_now(at(9, 10, 0))
        .build()
        .unwrap()
}

fn classification(tool: &str, params: serde_json::Value) -> String {
    json!({"intent": tool, "confidence": 90, "function_to_call": tool, "extracted_params": params}).to_string()
}

#[tokio::test]
async fn test_find_slot_then_book() {
    let llm = Arc::new(MockLlm::with_texts(&[
        &classification("get_booking_slots", json!({"service": "Pottery Basics", "date": "2025-03-10"})),
        &classification(
            "create_booking",
            json!({"service": "Pottery Basics", "date": "2025-03-10", "time": "10:00",
                   "customer_name": "Ana Lima", "customer_email": "ana@example.com"}),
        ),
    ]));
    let calendar = calendar();
    let engine = engine(llm.clone(), tabs(), calendar.clone());

    let mut messages = vec![ConversationMessage::user("I'd like to book pottery on March 10th")];
    let first = engine
        .classic
        .handle(ConversationRequest::new("studio-1", messages.clone()))
        .await
        .unwrap();

    assert_eq!(first.function_to_call, Some(ToolName::GetBookingSlots));
    assert!(first.text.starts_with("There are 8 open slots for Pottery Basics, starting 2025-03-10 09:00."));
    assert!(matches!(first.ui_components[0], ComponentSpec::SlotPicker { .. }));

    messages.push(ConversationMessage::assistant(first.text.clone()));
    messages.push(ConversationMessage::user("10:00 please, I'm Ana Lima, ana@example.com"));
    let second = engine
        .classic
        .handle(ConversationRequest::new("studio-1", messages))
        .await
        .unwrap();

    assert!(second.text.starts_with("You're booked! Pottery Basics on 2025-03-10 at 10:00 for Ana Lima."));
    assert_eq!(calendar.events().len(), 2);
    // Both turns were answered from templates.
    assert_eq!(llm.call_count(), 2);
    assert_ne!(first.trace_id, second.trace_id);

    // The second classifier request carried the earlier exchange.
    let requests = llm.requests();
    assert!(requests[1].messages.iter().any(|m| m.content.contains("open slots")));
    assert_eq!(second.debug.stage_total(Stage::Response).input_tokens, 0);
}

#[tokio::test]
async fn test_native_lead_capture_writes_row() {
    let llm = Arc::new(MockLlm::new(vec![MockLlm::tool_call(
        "call-1",
        "capture_lead",
        json!({"name": "Ana Lima", "email": "ana@example.com", "interest": "Pottery Basics"}),
    )]));
    let tabs = tabs();
    let engine = engine(llm.clone(), tabs.clone(), calendar());

    let response = engine
        .native
        .handle(ConversationRequest::new(
            "studio-1",
            vec![ConversationMessage::user("Can someone email me about pottery? Ana Lima, ana@example.com")],
        ))
        .await
        .unwrap();

    assert_eq!(response.text, "Thanks, Ana Lima! We've passed your details on and someone will be in touch soon.");
    assert_eq!(llm.call_count(), 1);

    let appended = tabs.appended();
    assert_eq!(appended.len(), 1);
    let (tab, row) = &appended[0];
    assert_eq!(tab, "Leads");
    assert_eq!(row["Email"], "ana@example.com");
    assert_eq!(row["Timestamp"], "2025-03-09 10:00:00");
}
