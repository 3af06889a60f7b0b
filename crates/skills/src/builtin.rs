//! Built-in business tools.

mod booking;
mod lead;
mod recommend;
mod search;
mod store_info;

use chrono::{NaiveDate, NaiveTime};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::matcher::ScoredMatch;
use crate::records::ServiceRecord;
use crate::tool::BusinessTool;

pub use booking::{CheckAvailabilityTool, CreateBookingTool, GetBookingSlotsTool};
pub use lead::CaptureLeadTool;
pub use recommend::RecommendServicesTool;
pub use search::{SearchProductsTool, SearchServicesTool};
pub use store_info::GetStoreInfoTool;

/// Every built-in tool, in prompt order.
pub fn all() -> Vec<Arc<dyn BusinessTool>> {
    vec![
        Arc::new(GetStoreInfoTool),
        Arc::new(SearchServicesTool),
        Arc::new(SearchProductsTool),
        Arc::new(CaptureLeadTool),
        Arc::new(CheckAvailabilityTool),
        Arc::new(CreateBookingTool),
        Arc::new(GetBookingSlotsTool),
        Arc::new(RecommendServicesTool),
    ]
}

// ===== Argument helpers =====
//
// Arguments reaching a tool are already validated, so these only read them.

fn arg_str<'a>(args: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

fn arg_f64(args: &Map<String, Value>, key: &str) -> Option<f64> {
    args.get(key).and_then(Value::as_f64)
}

fn arg_date(args: &Map<String, Value>, key: &str) -> Option<NaiveDate> {
    arg_str(args, key).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

fn arg_time(args: &Map<String, Value>, key: &str) -> Option<NaiveTime> {
    arg_str(args, key).and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok())
}

/// Service as shown to callers, with an optional relevance score.
fn service_json(service: &ServiceRecord, score: Option<f64>) -> Value {
    let mut value = json!({
        "id": service.id,
        "name": service.name,
        "description": service.description,
        "category": service.category,
        "tags": service.tags,
        "price": service.price,
        "duration_minutes": service.duration_minutes,
        "capacity": service.capacity,
        "image_url": service.image_url,
    });
    if let Some(level) = &service.level {
        value["level"] = json!(level);
    }
    if let Some(score) = score {
        value["score"] = json!((score * 10.0).round() / 10.0);
    }
    value
}

fn service_card(service: &ServiceRecord) -> Value {
    json!({
        "id": service.id,
        "name": service.name,
        "price": service.price,
        "duration_minutes": service.duration_minutes,
        "image_url": service.image_url,
    })
}

fn scored_services(matches: &[ScoredMatch<ServiceRecord>]) -> Vec<Value> {
    matches.iter().map(|m| service_json(&m.item, Some(m.score))).collect()
}
