//! Fixtures shared by the orchestrator tests: a small pottery studio.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;
use std::sync::Arc;

use concierge_controller::{Concierge, ConciergeBuilder};
use concierge_core::config::{AppConfig, CacheStrategyKind};
use concierge_core::mocks::{MockCalendar, MockLlm, MockTabSource};
use concierge_core::{CalendarEvent, ConversationMessage, ConversationRequest, EventKind};

pub fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

pub fn studio_tabs() -> MockTabSource {
    MockTabSource::new()
        .with_tab(
            "Services",
            &[],
            vec![
                json!({"ID": "svc-wheel", "Name": "Wheel Throwing", "Category": "Pottery", "Price": "60",
                       "Duration": "90", "Capacity": "4", "Description": "Centre and throw on the wheel."}),
                json!({"ID": "svc-water", "Name": "Watercolour Evening", "Category": "Painting", "Price": "35",
                       "Duration": "120", "Capacity": "8", "Description": "Loose washes and wine."}),
                json!({"ID": "svc-pottery", "Name": "Pottery Basics", "Category": "Pottery", "Tags": "beginner, clay",
                       "Price": "45", "Duration": "60", "Capacity": "5",
                       "Description": "Hand-building for complete beginners.", "Image": "https://img.example/pottery.png"}),
            ],
        )
        .with_tab(
            "Hours",
            &[],
            vec![json!({"Day": "Monday", "Open": "09:00", "Close": "17:00"})],
        )
        .with_tab(
            "Leads",
            &["Timestamp", "Name", "Email", "Phone", "Interest", "Message"],
            vec![],
        )
}

/// Pottery Basics runs from 09:00 to 17:00 on 2025-03-10.
pub fn studio_calendar() -> MockCalendar {
    MockCalendar::with_events(vec![CalendarEvent {
        id: "w1".into(),
        summary: "Pottery Basics".into(),
        description: None,
        start: at(10, 9, 0),
        end: at(10, 17, 0),
        kind: EventKind::Availability,
        service_id: Some("svc-pottery".into()),
    }])
}

pub fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.cache.strategy = CacheStrategyKind::Memory;
    config.model.default_model = "mock-model".into();
    config
}

pub fn concierge_with(config: AppConfig, llm: Arc<MockLlm>, calendar: Arc<MockCalendar>) -> Concierge {
    ConciergeBuilder::new(config)
        .with_llm(llm)
        .with_tab_source(Arc::new(studio_tabs()))
        .with_calendar(calendar)
        .with_fixed_now(at(9, 10, 0))
        .build()
        .unwrap()
}

pub fn concierge(llm: Arc<MockLlm>) -> Concierge {
    concierge_with(config(), llm, Arc::new(studio_calendar()))
}

pub fn ask(text: &str) -> ConversationRequest {
    ConversationRequest::new("studio-1", vec![ConversationMessage::user(text)])
}
