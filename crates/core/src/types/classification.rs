use serde::{Deserialize, Serialize};

use super::tool::ToolName;

// =============================================================================
// Classification (Classifier Output)
// =============================================================================

/// Intent classification for one user turn.
///
/// Produced once per request and never mutated afterwards. When
/// `function_to_call` is set it always names a registered tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    /// Free-form intent label (e.g. "booking", "product_search").
    pub intent: String,

    /// Confidence in the range 0..=100.
    pub confidence: u8,

    /// Whether the classifier wants more information first.
    pub needs_clarification: bool,

    /// Question to ask when clarification is needed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification_question: Option<String>,

    /// Tool to dispatch, if any.
    pub function_to_call: Option<ToolName>,

    /// Arguments extracted from the conversation.
    pub extracted_params: serde_json::Map<String, serde_json::Value>,

    /// ISO-639-1 language code of the user's message.
    pub detected_language: String,

    /// Optional model reasoning, only present when reasoning was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Classification {
    /// A plain conversational turn with no tool.
    pub fn conversational(intent: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            confidence: 100,
            needs_clarification: false,
            clarification_question: None,
            function_to_call: None,
            extracted_params: serde_json::Map::new(),
            detected_language: "en".to_string(),
            reasoning: None,
        }
    }

    /// Arguments as a JSON value for dispatch.
    pub fn params_value(&self) -> serde_json::Value {
        serde_json::Value::Object(self.extracted_params.clone())
    }
}
