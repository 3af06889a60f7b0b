//! Fixtures shared by the tool tests: a small craft studio.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde_json::json;
use std::sync::Arc;

use concierge_core::mocks::{MockCalendar, MockLlm, MockTabSource};
use concierge_core::{CalendarEvent, EventKind};
use concierge_store::TabLoader;

use crate::context::ToolContext;
use crate::matcher::SemanticMatcher;

/// 2025-03-`day` at `hour:minute`.
pub fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, day)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .unwrap()
}

pub fn availability(id: &str, start: NaiveDateTime, end: NaiveDateTime, service_id: Option<&str>) -> CalendarEvent {
    CalendarEvent {
        id: id.into(),
        summary: "Open session".into(),
        description: None,
        start,
        end,
        kind: EventKind::Availability,
        service_id: service_id.map(String::from),
    }
}

pub fn booking(id: &str, start: NaiveDateTime, service_id: &str) -> CalendarEvent {
    CalendarEvent {
        id: id.into(),
        summary: "Booking".into(),
        description: None,
        start,
        end: start + Duration::minutes(60),
        kind: EventKind::Booking,
        service_id: Some(service_id.into()),
    }
}

pub fn studio_tabs() -> MockTabSource {
    MockTabSource::new()
        .with_tab(
            "Services",
            &[],
            vec![
                json!({"ID": "svc-wheel", "Name": "Wheel Throwing", "Category": "Pottery", "Tags": "intermediate",
                       "Price": "$60", "Duration": 90, "Capacity": 4, "Description": "Centre clay on the wheel"}),
                json!({"ID": "svc-water", "Name": "Watercolour Evening", "Category": "Painting", "Tags": "relaxed",
                       "Price": 35, "Duration": 120, "Capacity": 8, "Description": "Loose washes and colour"}),
                json!({"ID": "svc-pottery", "Name": "Pottery Basics", "Category": "Pottery", "Tags": "beginner, clay",
                       "Price": "$45", "Duration": 60, "Capacity": 5, "Description": "Hand-building for first timers"}),
            ],
        )
        .with_tab(
            "Products",
            &[],
            vec![
                json!({"Name": "Air-Dry Clay", "Category": "Clay", "Price": 12}),
                json!({"Name": "Stoneware Clay", "Category": "Clay", "Price": 28}),
                json!({"Name": "Clay Tool Kit", "Category": "Tools"}),
            ],
        )
        .with_tab(
            "Hours",
            &[],
            vec![
                json!({"Day": "Monday", "Open": "09:00", "Close": "17:00"}),
                json!({"Day": "Sunday", "Open": "Closed"}),
            ],
        )
        .with_tab("Leads", &["Timestamp", "Name", "Email", "Phone", "Interest", "Message"], vec![])
}

pub fn context_with_source(source: Arc<MockTabSource>) -> ToolContext {
    build(source, Arc::new(MockCalendar::new()))
}

pub fn context_with_tabs(tabs: MockTabSource) -> ToolContext {
    context_with_source(Arc::new(tabs))
}

pub fn context_with_calendar(calendar: Arc<MockCalendar>) -> ToolContext {
    build(Arc::new(studio_tabs()), calendar)
}

fn build(source: Arc<MockTabSource>, calendar: Arc<MockCalendar>) -> ToolContext {
    ToolContext::new(
        "studio",
        Arc::new(TabLoader::new(source)),
        calendar,
        Arc::new(SemanticMatcher::new(Arc::new(MockLlm::constant("{}")))),
    )
    .with_now(at(9, 10, 0))
}
