use serde::{Deserialize, Serialize};

use super::function_result::{ComponentSpec, FunctionResult};
use super::store::{Row, StoreData};
use super::tool::ToolName;
use super::trace::DebugTrace;
use crate::error::{Error, Result};

// =============================================================================
// Inbound Request
// =============================================================================

/// One turn of the conversation as sent by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationMessage {
    pub role: String,
    pub content: String,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == "user"
    }
}

/// Data the caller passes along under the caller-supplied caching strategy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CachedData {
    #[serde(default)]
    pub services: Option<Vec<Row>>,
    #[serde(default)]
    pub products: Option<Vec<Row>>,
    #[serde(default)]
    pub hours: Option<Vec<Row>>,
}

impl From<CachedData> for StoreData {
    fn from(value: CachedData) -> Self {
        StoreData {
            services: value.services,
            products: value.products,
            hours: value.hours,
        }
    }
}

/// Request accepted by both orchestrators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    pub messages: Vec<ConversationMessage>,

    pub store_id: String,

    /// Completion model override.
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub reasoning_enabled: bool,

    #[serde(default)]
    pub cached_data: Option<CachedData>,
}

impl ConversationRequest {
    pub fn new(store_id: impl Into<String>, messages: Vec<ConversationMessage>) -> Self {
        Self {
            messages,
            store_id: store_id.into(),
            model: None,
            reasoning_enabled: false,
            cached_data: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_cached_data(mut self, data: CachedData) -> Self {
        self.cached_data = Some(data);
        self
    }

    /// Check the request shape before any external call is made.
    pub fn validate(&self) -> Result<()> {
        if self.store_id.trim().is_empty() {
            return Err(Error::invalid_request("storeId must not be empty"));
        }
        match self.messages.last() {
            None => Err(Error::invalid_request("messages must not be empty")),
            Some(last) if !last.is_user() => {
                Err(Error::invalid_request("last message must come from the user"))
            }
            Some(last) if last.content.trim().is_empty() => {
                Err(Error::invalid_request("user message must not be empty"))
            }
            Some(_) => Ok(()),
        }
    }

    /// The current utterance (content of the last user message).
    pub fn utterance(&self) -> &str {
        self.messages.last().map(|m| m.content.as_str()).unwrap_or_default()
    }

    /// Up to `turns` messages preceding the utterance.
    pub fn history(&self, turns: usize) -> &[ConversationMessage] {
        let end = self.messages.len().saturating_sub(1);
        let start = end.saturating_sub(turns);
        &self.messages[start..end]
    }
}

// =============================================================================
// Response
// =============================================================================

/// Which orchestrator produced a response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    Classic,
    Native,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Native => "native",
        }
    }
}

/// Reply returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub trace_id: String,
    pub text: String,
    pub intent: String,
    pub function_to_call: Option<ToolName>,
    pub confidence: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_result: Option<FunctionResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ui_components: Vec<ComponentSpec>,
    pub debug: DebugTrace,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(messages: Vec<ConversationMessage>) -> ConversationRequest {
        ConversationRequest::new("store-1", messages)
    }

    #[test]
    fn test_validate_rejects_empty_and_non_user_last() {
        assert!(request(vec![]).validate().is_err());
        let req = request(vec![ConversationMessage::user("hi"), ConversationMessage::assistant("hello")]);
        assert!(matches!(req.validate(), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_history_excludes_utterance() {
        let req = request(vec![
            ConversationMessage::user("a"),
            ConversationMessage::assistant("b"),
            ConversationMessage::user("c"),
            ConversationMessage::assistant("d"),
            ConversationMessage::user("e"),
        ]);
        assert_eq!(req.utterance(), "e");
        let history = req.history(2);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "c");
        assert_eq!(history[1].content, "d");
        assert_eq!(req.history(10).len(), 4);
    }

    #[test]
    fn test_camel_case_wire_format() {
        let req: ConversationRequest = serde_json::from_value(serde_json::json!({
            "messages": [{"role": "user", "content": "hours?"}],
            "storeId": "s-9",
            "reasoningEnabled": true,
            "cachedData": {"hours": [{"day": "Monday"}]}
        }))
        .unwrap();
        assert_eq!(req.store_id, "s-9");
        assert!(req.reasoning_enabled);
        assert_eq!(req.cached_data.unwrap().hours.unwrap().len(), 1);
    }
}
