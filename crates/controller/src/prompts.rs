//! Prompt construction for every model call the orchestrators make.

use std::fmt::Write;

use concierge_core::{StoreData, ToolDefinition};
use concierge_skills::{truncate, HoursRecord, ProductRecord, ServiceRecord};

/// Version of the classifier instruction block. Bump when the wording or the
/// tool heuristics change so traces can be compared across prompt revisions.
pub const CLASSIFIER_PROMPT_VERSION: &str = "2025-03.2";

const CATALOGUE_LIMIT: usize = 15;

const CLASSIFIER_RULES: &str = "\
Selection rules:
- Someone who wants to book, reserve or sign up for something needs get_booking_slots, not check_availability. \
Use check_availability only when they ask whether a specific date is free.
- Use create_booking only when the service, date, time and the customer's name are all known.
- Questions about opening hours, location or what the store offers in general go to get_store_info.
- Looking for a class, treatment or service goes to search_services; physical goods go to search_products.
- Asking what would suit them, or for advice, goes to recommend_services.
- Wanting to be contacted, leaving details or asking for a callback goes to capture_lead.
- Greetings, thanks and small talk need no tool: set function_to_call to null.
- Write queries as short keyword phrases, e.g. \"beginner pottery\" rather than a full sentence.
- Dates are YYYY-MM-DD and times are HH:MM (24h).
- If a required parameter is missing and cannot be inferred, set needs_clarification to true and ask for it.";

/// System prompt for the classic pipeline's classification call.
pub fn classifier_system_prompt(tools: &[ToolDefinition], store_summary: Option<&str>, reasoning: bool) -> String {
    let mut prompt = String::from(
        "You route customer messages for a small business assistant. \
         Decide whether the latest message needs one of the tools below and extract its parameters.\n\n",
    );
    let _ = writeln!(prompt, "Prompt version: {}\n\nTools:", CLASSIFIER_PROMPT_VERSION);
    for tool in tools {
        let _ = writeln!(prompt, "- {}: {}", tool.name, tool.description);
        let required: Vec<&str> = tool.parameters["required"]
            .as_array()
            .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();
        if let Some(properties) = tool.parameters["properties"].as_object() {
            for (name, schema) in properties {
                let marker = if required.contains(&name.as_str()) { " (required)" } else { "" };
                let _ = writeln!(
                    prompt,
                    "    {}{}: {}",
                    name,
                    marker,
                    schema["description"].as_str().unwrap_or_default()
                );
            }
        }
    }
    let _ = writeln!(prompt, "\n{}", CLASSIFIER_RULES);

    if let Some(summary) = store_summary {
        let _ = writeln!(prompt, "\nStore data:\n{}", summary);
    }

    prompt.push_str(
        "\nReply with a single JSON object and nothing else:\n\
         {\"intent\": string, \"confidence\": 0-100, \"needs_clarification\": bool, \
         \"clarification_question\": string|null, \"function_to_call\": tool name|null, \
         \"extracted_params\": object, \"detected_language\": ISO-639-1 code",
    );
    if reasoning {
        prompt.push_str(", \"reasoning\": one or two sentences explaining the choice");
    }
    prompt.push_str("}\nAlways include function_to_call and extracted_params, even when null or empty.");
    prompt
}

/// Compact, prompt-sized description of what the store offers.
pub fn store_summary(store_id: &str, data: &StoreData) -> String {
    let mut out = format!("Store: {}\n", store_id);

    if let Some(rows) = &data.services {
        let services = ServiceRecord::parse_all(rows, 1);
        let _ = writeln!(out, "Services ({}):", services.len());
        for s in services.iter().take(CATALOGUE_LIMIT) {
            let _ = writeln!(out, "- {}{}{}", s.name, price_suffix(s.price), category_suffix(&s.category));
        }
    }
    if let Some(rows) = &data.products {
        let products = ProductRecord::parse_all(rows);
        let _ = writeln!(out, "Products ({}):", products.len());
        for p in products.iter().take(CATALOGUE_LIMIT) {
            let _ = writeln!(out, "- {}{}", p.name, price_suffix(p.price));
        }
    }
    if let Some(rows) = &data.hours {
        let hours: Vec<String> = HoursRecord::parse_all(rows)
            .iter()
            .map(|h| {
                if h.closed {
                    format!("{} closed", h.day)
                } else {
                    format!(
                        "{} {}-{}",
                        h.day,
                        h.open.as_deref().unwrap_or("?"),
                        h.close.as_deref().unwrap_or("?")
                    )
                }
            })
            .collect();
        if !hours.is_empty() {
            let _ = writeln!(out, "Hours: {}", hours.join("; "));
        }
    }
    out.trim_end().to_string()
}

fn price_suffix(price: Option<f64>) -> String {
    price.map(|p| format!(" (${:.2})", p)).unwrap_or_default()
}

fn category_suffix(category: &str) -> String {
    if category.is_empty() {
        String::new()
    } else {
        format!(" [{}]", category)
    }
}

/// System prompt for the responder.
pub fn responder_system_prompt(store_summary: &str, max_words: usize) -> String {
    format!(
        "You are the friendly assistant of a small business, talking to a customer in a chat widget.\n\n\
         {store}\n\n\
         Rules:\n\
         - Use the tool result, when one is given, as the source of truth. Never invent prices, times or availability.\n\
         - Keep the reply under {words} words. Plain prose, no Markdown tables.\n\
         - Reply in the customer's language (the classification's detected_language).\n\
         - If the classification needs clarification, ask exactly its clarification_question and nothing else.\n\
         - Offer up to three short follow-up suggestions the customer could tap.\n\n\
         Reply with a JSON object: {{\"response\": \"...\", \"suggestions\": [\"...\"]}}",
        store = store_summary,
        words = max_words,
    )
}

/// System prompt for the native tool-calling loop.
pub fn native_system_prompt(store_summary: &str) -> String {
    format!(
        "You are the friendly assistant of a small business, talking to a customer in a chat widget.\n\n\
         {store}\n\n\
         Call the available tools whenever the customer needs live data or wants something done. \
         Someone who wants to book should see open slots (get_booking_slots) before a booking is created. \
         When you have what you need, answer in plain prose in the customer's language, under 120 words.",
        store = store_summary,
    )
}

/// System prompt for the background quality grader.
pub const GRADING_PROMPT: &str = "\
You review replies written by a small-business chat assistant. \
Score how helpful, accurate and on-brand the reply is for the customer's message on a scale of 1 to 10. \
Reply with a JSON object: {\"score\": integer 1-10, \"rationale\": one short sentence}.";

/// User turn for the grader.
pub fn grading_input(utterance: &str, reply: &str) -> String {
    format!(
        "Customer message:\n{}\n\nAssistant reply:\n{}",
        truncate(utterance, 1000),
        truncate(reply, 2000)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::Row;
    use serde_json::{json, Value};

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn studio() -> StoreData {
        StoreData {
            services: Some(vec![
                row(json!({"Name": "Pottery Basics", "Price": "45", "Category": "Pottery"})),
                row(json!({"Name": "Open Studio"})),
            ]),
            products: None,
            hours: Some(vec![
                row(json!({"Day": "Monday", "Open": "09:00", "Close": "17:00"})),
                row(json!({"Day": "Sunday", "Closed": "yes"})),
            ]),
        }
    }

    #[test]
    fn test_store_summary_is_compact() {
        let summary = store_summary("studio-1", &studio());
        assert!(summary.starts_with("Store: studio-1"));
        assert!(summary.contains("- Pottery Basics ($45.00) [Pottery]"));
        assert!(summary.contains("- Open Studio\n"));
        assert!(summary.contains("Hours: Monday 09:00-17:00; Sunday closed"));
        assert!(!summary.contains("Products"));
    }

    #[test]
    fn test_classifier_prompt_lists_tools_and_version() {
        let tools = vec![ToolDefinition {
            name: "search_services".into(),
            description: "Search services".into(),
            parameters: json!({
                "type": "object",
                "properties": {"query": {"type": "string", "description": "What to look for"}},
                "required": ["query"]
            }),
        }];
        let prompt = classifier_system_prompt(&tools, None, false);
        assert!(prompt.contains(CLASSIFIER_PROMPT_VERSION));
        assert!(prompt.contains("- search_services: Search services"));
        assert!(prompt.contains("query (required): What to look for"));
        assert!(prompt.contains("get_booking_slots, not check_availability"));
        assert!(!prompt.contains("\"reasoning\""));
        assert!(classifier_system_prompt(&tools, None, true).contains("\"reasoning\""));
    }
}
