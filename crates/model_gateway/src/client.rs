//! OpenAI-compatible chat-completion client.
//!
//! Speaks the `/chat/completions` dialect shared by OpenAI, OpenRouter and
//! most self-hosted gateways: strict JSON replies via `response_format`,
//! native tool selection via `tools`, and `reasoning_effort` when asked.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

use concierge_core::{
    config::ModelConfig,
    traits::{ChatMessage, CompletionRequest, LlmClient, LlmResponse, LlmUsage},
    Error, Result, ToolCall, ToolDefinition,
};

const SERVICE: &str = "completion";

// ============================================================================
// Configuration
// ============================================================================

#[derive(Clone)]
pub struct OpenAiCompatConfig {
    /// Base URL, without the `/chat/completions` suffix.
    pub base_url: String,
    pub api_key: Option<Secret<String>>,
    pub default_model: String,
    pub timeout: Duration,
}

impl fmt::Debug for OpenAiCompatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("default_model", &self.default_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl From<&ModelConfig> for OpenAiCompatConfig {
    fn from(config: &ModelConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            default_model: config.default_model.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Serialize)]
struct WireTool {
    r#type: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: WireFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded arguments.
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    model: String,
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: WireErrorBody,
}

#[derive(Debug, Deserialize)]
struct WireErrorBody {
    message: String,
}

// ============================================================================
// Conversion
// ============================================================================

fn to_wire_message(message: &ChatMessage) -> WireMessage {
    WireMessage {
        role: message.role.clone(),
        content: Some(message.content.clone()),
        tool_call_id: message.tool_call_id.clone(),
        tool_calls: message.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    r#type: function_type(),
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect()
        }),
    }
}

fn to_wire_tool(tool: &ToolDefinition) -> WireTool {
    WireTool {
        r#type: "function",
        function: WireFunction {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

fn to_wire_request(request: &CompletionRequest, default_model: &str) -> WireRequest {
    WireRequest {
        model: request
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_model.to_string()),
        messages: request.messages.iter().map(to_wire_message).collect(),
        tools: (!request.tools.is_empty()).then(|| request.tools.iter().map(to_wire_tool).collect()),
        response_format: request
            .json_mode
            .then(|| serde_json::json!({"type": "json_object"})),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        reasoning_effort: request.reasoning.then(|| "medium".to_string()),
    }
}

fn from_wire_response(response: WireResponse, requested_model: &str) -> Result<LlmResponse> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::malformed("No choices in completion response"))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| -> Result<ToolCall> {
            let arguments = if call.function.arguments.trim().is_empty() {
                Value::Object(Default::default())
            } else {
                serde_json::from_str(&call.function.arguments).map_err(|e| {
                    Error::malformed(format!(
                        "Tool '{}' arguments are not valid JSON: {}",
                        call.function.name, e
                    ))
                })?
            };
            Ok(ToolCall {
                id: call.id,
                name: call.function.name,
                arguments,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let usage = response
        .usage
        .map(|u| LlmUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: if u.total_tokens == 0 {
                u.prompt_tokens + u.completion_tokens
            } else {
                u.total_tokens
            },
        })
        .unwrap_or_default();

    Ok(LlmResponse {
        content: choice.message.content.unwrap_or_default(),
        finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
        usage,
        tool_calls,
        model: if response.model.is_empty() {
            requested_model.to_string()
        } else {
            response.model
        },
    })
}

/// Keep provider error text short and free of key material.
fn sanitize_api_error(error: &str) -> String {
    let lower = error.to_lowercase();
    if lower.contains("api key") || lower.contains("unauthorized") || lower.contains("authentication") {
        return "API authentication error. Please check the model API key.".to_string();
    }
    if error.chars().count() > 300 {
        let truncated: String = error.chars().take(300).collect();
        format!("{}...(truncated)", truncated)
    } else {
        error.to_string()
    }
}

// ============================================================================
// Client
// ============================================================================

/// Chat-completion client for OpenAI-compatible endpoints.
pub struct OpenAiCompatClient {
    client: Client,
    config: OpenAiCompatConfig,
}

impl OpenAiCompatClient {
    pub fn new(config: OpenAiCompatConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        Self::new(OpenAiCompatConfig::from(config))
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    #[instrument(skip(self, request), fields(tools = request.tools.len(), json = request.json_mode))]
    async fn chat(&self, request: CompletionRequest) -> Result<LlmResponse> {
        let body = to_wire_request(&request, &self.config.default_model);
        let url = format!("{}/chat/completions", self.config.base_url);
        debug!(model = %body.model, messages = body.messages.len(), "Sending completion request");

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("{} request timed out", SERVICE))
            } else {
                Error::external(SERVICE, None, e.to_string())
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::external(SERVICE, Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<WireError>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(Error::external(SERVICE, Some(status.as_u16()), sanitize_api_error(&message)));
        }

        let wire: WireResponse = serde_json::from_str(&text)
            .map_err(|e| Error::malformed(format!("Unreadable completion response: {}", e)))?;
        from_wire_response(wire, &body.model)
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_json_mode_and_tools() {
        let request = CompletionRequest::new(vec![ChatMessage::system("sys"), ChatMessage::user("hi")])
            .json()
            .with_reasoning(true)
            .with_tools(vec![ToolDefinition {
                name: "search_services".into(),
                description: "Search".into(),
                parameters: json!({"type": "object"}),
            }]);
        let wire = serde_json::to_value(to_wire_request(&request, "gpt-4o-mini")).unwrap();

        assert_eq!(wire["model"], "gpt-4o-mini");
        assert_eq!(wire["response_format"]["type"], "json_object");
        assert_eq!(wire["reasoning_effort"], "medium");
        assert_eq!(wire["tools"][0]["type"], "function");
        assert_eq!(wire["tools"][0]["function"]["name"], "search_services");
        assert_eq!(wire["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_request_omits_optional_fields() {
        let request = CompletionRequest::new(vec![ChatMessage::user("hi")]).with_model(Some("other".into()));
        let wire = serde_json::to_value(to_wire_request(&request, "gpt-4o-mini")).unwrap();
        assert_eq!(wire["model"], "other");
        assert!(wire.get("tools").is_none());
        assert!(wire.get("response_format").is_none());
        assert!(wire.get("reasoning_effort").is_none());
    }

    #[test]
    fn test_tool_history_round_trips_arguments_as_string() {
        let call = ToolCall {
            id: "call_1".into(),
            name: "get_store_info".into(),
            arguments: json!({"topic": "hours"}),
        };
        let wire = to_wire_message(&ChatMessage::assistant_tool_calls("", vec![call]));
        let value = serde_json::to_value(&wire).unwrap();
        assert_eq!(value["tool_calls"][0]["function"]["arguments"], "{\"topic\":\"hours\"}");
    }

    #[test]
    fn test_response_parses_tool_calls_and_usage() {
        let wire: WireResponse = serde_json::from_value(json!({
            "model": "gpt-4o-mini-2024",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "check_availability", "arguments": "{\"date\":\"2025-03-10\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 50, "completion_tokens": 7, "total_tokens": 57}
        }))
        .unwrap();

        let response = from_wire_response(wire, "gpt-4o-mini").unwrap();
        assert_eq!(response.content, "");
        assert_eq!(response.tool_calls[0].arguments, json!({"date": "2025-03-10"}));
        assert_eq!(response.usage.total_tokens, 57);
        assert_eq!(response.model, "gpt-4o-mini-2024");
    }

    #[test]
    fn test_invalid_tool_arguments_are_malformed() {
        let wire: WireResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "tool_calls": [{"id": "c", "function": {"name": "x", "arguments": "{not json"}}]
                }
            }]
        }))
        .unwrap();
        assert!(matches!(
            from_wire_response(wire, "m"),
            Err(Error::MalformedModelOutput(_))
        ));
    }

    #[test]
    fn test_empty_choices_are_malformed() {
        let wire: WireResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(from_wire_response(wire, "m").is_err());
    }

    #[test]
    fn test_sanitize_hides_auth_details() {
        assert!(sanitize_api_error("Incorrect API key provided: sk-abc").contains("authentication"));
        assert_eq!(sanitize_api_error("model overloaded"), "model overloaded");
    }
}
