//! Static follow-up suggestions, used when no model produced any.

use concierge_core::ToolName;

/// Follow-up suggestions for a turn.
///
/// The tool decides when one ran; otherwise the intent label is matched
/// loosely.
pub fn for_turn(intent: &str, tool: Option<&ToolName>) -> Vec<String> {
    let list: &[&str] = match tool {
        Some(ToolName::GetStoreInfo) => &["What services do you offer?", "Can I book a session?"],
        Some(ToolName::SearchServices) => &["Show me open times", "How much does it cost?", "Recommend something for me"],
        Some(ToolName::SearchProducts) => &["Is it in stock?", "Do you have anything cheaper?"],
        Some(ToolName::CaptureLead) => &["What services do you offer?", "What are your opening hours?"],
        Some(ToolName::CheckAvailability) => &["Book a spot", "Show other days"],
        Some(ToolName::CreateBooking) => &["Show other times", "What should I bring?"],
        Some(ToolName::GetBookingSlots) => &["Book the first slot", "Show next week"],
        Some(ToolName::RecommendServices) => &["Show me open times", "Tell me more about the first one"],
        Some(ToolName::Unknown(_)) | None => by_intent(intent),
    };
    list.iter().map(|s| s.to_string()).collect()
}

fn by_intent(intent: &str) -> &'static [&'static str] {
    let intent = intent.to_lowercase();
    if intent.contains("book") || intent.contains("availability") || intent.contains("schedule") {
        &["Show open times", "What services do you offer?"]
    } else if intent.contains("product") || intent.contains("shop") {
        &["Show me your products", "What's on sale?"]
    } else if intent.contains("hour") || intent.contains("info") || intent.contains("location") {
        &["What are your opening hours?", "What services do you offer?"]
    } else {
        &["What services do you offer?", "What are your opening hours?", "Can I book a session?"]
    }
}
