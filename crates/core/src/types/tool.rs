use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Tool Identifiers
// =============================================================================

/// Identifier of a business tool.
///
/// Dispatch is closed over the known variants; anything else the model (or a
/// caller) names ends up in [`ToolName::Unknown`] so it can be reported back
/// instead of silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ToolName {
    GetStoreInfo,
    SearchServices,
    SearchProducts,
    CaptureLead,
    CheckAvailability,
    CreateBooking,
    GetBookingSlots,
    RecommendServices,
    Unknown(String),
}

impl ToolName {
    /// Every tool the registry can execute, in prompt order.
    pub const KNOWN: &'static [ToolName] = &[
        ToolName::GetStoreInfo,
        ToolName::SearchServices,
        ToolName::SearchProducts,
        ToolName::CaptureLead,
        ToolName::CheckAvailability,
        ToolName::CreateBooking,
        ToolName::GetBookingSlots,
        ToolName::RecommendServices,
    ];

    /// Parse a wire name.
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "get_store_info" => Self::GetStoreInfo,
            "search_services" => Self::SearchServices,
            "search_products" => Self::SearchProducts,
            "capture_lead" => Self::CaptureLead,
            "check_availability" => Self::CheckAvailability,
            "create_booking" => Self::CreateBooking,
            "get_booking_slots" => Self::GetBookingSlots,
            "recommend_services" => Self::RecommendServices,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Wire name of the tool.
    pub fn as_str(&self) -> &str {
        match self {
            Self::GetStoreInfo => "get_store_info",
            Self::SearchServices => "search_services",
            Self::SearchProducts => "search_products",
            Self::CaptureLead => "capture_lead",
            Self::CheckAvailability => "check_availability",
            Self::CreateBooking => "create_booking",
            Self::GetBookingSlots => "get_booking_slots",
            Self::RecommendServices => "recommend_services",
            Self::Unknown(name) => name,
        }
    }

    /// Whether the name refers to a registered tool.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<String> for ToolName {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ToolName> for String {
    fn from(value: ToolName) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Tool Schemas & Calls
// =============================================================================

/// Tool definition exposed to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,

    /// Human-readable description.
    pub description: String,

    /// JSON Schema for tool arguments.
    pub parameters: serde_json::Value,
}

/// A tool selected natively by the completion service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Provider-assigned call id, echoed back with the result.
    pub id: String,
    /// Tool name as written by the model.
    pub name: String,
    /// Parsed JSON arguments.
    pub arguments: serde_json::Value,
}

/// One executed tool call, kept for cost/latency accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallTrace {
    pub tool: String,
    pub arguments: serde_json::Value,
    pub duration_ms: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_known_names() {
        for tool in ToolName::KNOWN {
            assert_eq!(&ToolName::parse(tool.as_str()), tool);
            assert!(tool.is_known());
        }
    }

    #[test]
    fn test_unknown_name_is_preserved() {
        let tool = ToolName::parse("order_pizza");
        assert_eq!(tool, ToolName::Unknown("order_pizza".into()));
        assert!(!tool.is_known());
        assert_eq!(tool.to_string(), "order_pizza");
    }

    #[test]
    fn test_serde_uses_wire_name() {
        let json = serde_json::to_string(&ToolName::CreateBooking).unwrap();
        assert_eq!(json, "\"create_booking\"");
        let back: ToolName = serde_json::from_str("\"get_booking_slots\"").unwrap();
        assert_eq!(back, ToolName::GetBookingSlots);
    }
}
