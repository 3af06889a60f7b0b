//! Payload slimming before tool results are embedded into prompts.
//!
//! Fixed per tool. Image URLs and tag lists never reach the model, long
//! descriptions are cut, slot lists collapse to a summary and availability
//! windows keep only their times and spots.

use serde_json::{json, Map, Value};

use concierge_core::ToolName;

use crate::matcher::truncate;

/// Maximum description length kept for catalogue tools.
pub const DESCRIPTION_LIMIT: usize = 100;

const DROPPED_KEYS: &[&str] = &["image_url", "tags"];
const WINDOW_KEYS: &[&str] = &["start", "end", "date", "spots_remaining", "capacity"];

/// Slim a tool payload for prompt embedding.
pub fn slim_payload(tool: &ToolName, data: &Value) -> Value {
    let truncate_descriptions = matches!(
        tool,
        ToolName::SearchServices | ToolName::SearchProducts | ToolName::RecommendServices | ToolName::GetStoreInfo
    );
    let mut slimmed = strip(data, truncate_descriptions);

    match tool {
        ToolName::GetBookingSlots => {
            if let Some(obj) = slimmed.as_object_mut() {
                let summary = obj.get("slots").and_then(Value::as_array).map(|s| summarize_slots(s));
                if let Some(summary) = summary {
                    obj.insert("slots".into(), summary);
                }
            }
        }
        ToolName::CheckAvailability => {
            if let Some(Value::Array(windows)) = slimmed.get_mut("windows") {
                for window in windows.iter_mut() {
                    if let Value::Object(map) = window {
                        map.retain(|k, _| WINDOW_KEYS.contains(&k.as_str()));
                    }
                }
            }
        }
        _ => {}
    }
    slimmed
}

fn strip(value: &Value, truncate_descriptions: bool) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, v) in map {
                if DROPPED_KEYS.contains(&key.as_str()) {
                    continue;
                }
                let v = match (key.as_str(), v) {
                    ("description", Value::String(text)) if truncate_descriptions => {
                        Value::String(truncate(text, DESCRIPTION_LIMIT))
                    }
                    _ => strip(v, truncate_descriptions),
                };
                out.insert(key.clone(), v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| strip(v, truncate_descriptions)).collect()),
        other => other.clone(),
    }
}

fn summarize_slots(slots: &[Value]) -> Value {
    json!({
        "count": slots.len(),
        "first": slots.first().cloned().unwrap_or(Value::Null),
        "last": slots.last().cloned().unwrap_or(Value::Null),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_payload_drops_images_and_tags() {
        let long = "x".repeat(250);
        let data = json!({
            "results": [{"name": "Pottery Basics", "image_url": "http://img", "tags": ["clay"], "description": long}]
        });
        let slim = slim_payload(&ToolName::SearchServices, &data);
        let first = &slim["results"][0];
        assert!(first.get("image_url").is_none());
        assert!(first.get("tags").is_none());
        assert_eq!(first["description"].as_str().unwrap().len(), DESCRIPTION_LIMIT);
    }

    #[test]
    fn test_slots_collapse_to_summary() {
        let data = json!({"service": "Pottery Basics", "slots": ["2025-03-10 09:00", "2025-03-10 10:30", "2025-03-11 09:00"]});
        let slim = slim_payload(&ToolName::GetBookingSlots, &data);
        assert_eq!(
            slim["slots"],
            json!({"count": 3, "first": "2025-03-10 09:00", "last": "2025-03-11 09:00"})
        );
        assert_eq!(slim["service"], "Pottery Basics");
    }

    #[test]
    fn test_windows_keep_times_and_spots() {
        let data = json!({"windows": [{"id": "evt-1", "summary": "Studio", "start": "09:00", "end": "17:00", "spots_remaining": 3}]});
        let slim = slim_payload(&ToolName::CheckAvailability, &data);
        assert_eq!(slim["windows"][0], json!({"start": "09:00", "end": "17:00", "spots_remaining": 3}));
    }

    #[test]
    fn test_booking_descriptions_untouched() {
        let long = "y".repeat(150);
        let data = json!({"description": long.clone()});
        assert_eq!(slim_payload(&ToolName::CreateBooking, &data)["description"], json!(long));
    }
}
