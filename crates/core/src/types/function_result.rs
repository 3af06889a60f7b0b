use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Function Results (Tool Output)
// =============================================================================

/// Error tag for validation failures.
pub const ERR_VALIDATION: &str = "validation_failed";
/// Error tag for an unknown tool name.
pub const ERR_UNKNOWN_TOOL: &str = "unknown_tool";
/// Error tag for missing business data or services.
pub const ERR_RESOURCE_UNAVAILABLE: &str = "resource_unavailable";
/// Error tag for a booking slot with no remaining capacity.
pub const ERR_FULLY_BOOKED: &str = "fully_booked";
/// Error tag for a booking outside every availability window.
pub const ERR_NO_CLASS_SCHEDULED: &str = "no_class_scheduled";
/// Error tag for an external service failure inside a tool.
pub const ERR_EXTERNAL_SERVICE: &str = "external_service_error";

/// Canonical result of a business tool.
///
/// `awaiting_input` is not a failure: it means the dialogue needs more user
/// input. `skip_responder` means `message` must be used verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FunctionResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip_responder: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub needs_clarification: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub awaiting_input: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ui_components: Vec<ComponentSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,
}

impl FunctionResult {
    /// Successful result carrying data.
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            ..Default::default()
        }
    }

    /// Failed result with an error tag and a user-facing message.
    pub fn failure(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Failed validation with field-level messages.
    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            success: false,
            error: Some(ERR_VALIDATION.to_string()),
            message: Some(errors.join("; ")),
            validation_errors: errors,
            ..Default::default()
        }
    }

    /// Missing business data.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::failure(ERR_RESOURCE_UNAVAILABLE, message)
    }

    /// Dialogue needs more input before the tool can run.
    pub fn awaiting(message: impl Into<String>, component: ComponentSpec) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            awaiting_input: true,
            ui_components: vec![component],
            ..Default::default()
        }
    }

    /// Attach a message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Mark the message as final, bypassing the responder.
    pub fn verbatim(mut self) -> Self {
        self.skip_responder = true;
        self
    }

    /// Mark the result as a clarification request.
    pub fn clarifying(mut self) -> Self {
        self.needs_clarification = true;
        self
    }

    /// Attach a UI component.
    pub fn with_component(mut self, component: ComponentSpec) -> Self {
        self.ui_components.push(component);
        self
    }

    /// Whether this result carries the given error tag.
    pub fn has_error(&self, tag: &str) -> bool {
        self.error.as_deref() == Some(tag)
    }

    /// Collapse accidental `{"data": ...}` wrapping so consumers always see
    /// the payload directly under `data`.
    pub fn normalize(mut self) -> Self {
        while let Some(Value::Object(map)) = &self.data {
            if map.len() == 1 && map.contains_key("data") {
                self.data = map.get("data").cloned();
            } else {
                break;
            }
        }
        if matches!(self.data, Some(Value::Null)) {
            self.data = None;
        }
        if !self.success && self.error.is_none() {
            self.error = Some("tool_failed".to_string());
        }
        self
    }
}

// =============================================================================
// UI Components
// =============================================================================

/// UI component descriptor returned alongside a result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentSpec {
    /// Lead capture form built from the lead tab's headers.
    LeadForm { title: String, fields: Vec<FormField> },
    /// Recommendation intake questionnaire.
    IntakeForm { title: String, questions: Vec<FormField> },
    /// Bookable slot picker.
    SlotPicker { service_id: String, slots: Vec<String> },
    /// Compact service cards.
    ServiceCards { items: Vec<Value> },
}

/// One input in a generated form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub input_type: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl FormField {
    pub fn new(name: impl Into<String>, label: impl Into<String>, input_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            input_type: input_type.into(),
            required: false,
            options: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|o| o.to_string()).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_unwraps_nested_data() {
        let result = FunctionResult::ok(json!({"data": {"data": {"count": 2}}})).normalize();
        assert_eq!(result.data, Some(json!({"count": 2})));
    }

    #[test]
    fn test_normalize_keeps_multi_key_payloads() {
        let payload = json!({"data": [1, 2], "total": 2});
        let result = FunctionResult::ok(payload.clone()).normalize();
        assert_eq!(result.data, Some(payload));
    }

    #[test]
    fn test_normalize_tags_untagged_failures() {
        let result = FunctionResult {
            success: false,
            ..Default::default()
        }
        .normalize();
        assert_eq!(result.error.as_deref(), Some("tool_failed"));
    }

    #[test]
    fn test_awaiting_is_not_failure() {
        let result = FunctionResult::awaiting(
            "Tell us more",
            ComponentSpec::LeadForm { title: "Contact".into(), fields: vec![] },
        );
        assert!(result.success);
        assert!(result.awaiting_input);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_component_serializes_with_type_tag() {
        let component = ComponentSpec::SlotPicker { service_id: "svc-1".into(), slots: vec!["10:00".into()] };
        let value = serde_json::to_value(&component).unwrap();
        assert_eq!(value["type"], "slot_picker");
        assert_eq!(value["service_id"], "svc-1");
    }
}
