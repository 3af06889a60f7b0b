//! Intent classification for the classic pipeline.

use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

use concierge_core::config::ClassifierConfig;
use concierge_core::{
    ChatMessage, Classification, CompletionRequest, ConversationRequest, Error, LlmClient, LlmUsage, Result,
    ToolName,
};
use concierge_skills::{strip_fences, ToolRegistry};

use crate::prompts::classifier_system_prompt;

/// A classification together with what it cost.
#[derive(Debug, Clone)]
pub struct ClassifierOutput {
    pub classification: Classification,
    pub model: String,
    pub usage: LlmUsage,
    pub duration: Duration,
}

/// Single-shot JSON classifier over the registered tools.
pub struct Classifier {
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    timeout: Duration,
    history_turns: usize,
    include_store_data: bool,
}

impl Classifier {
    pub fn new(llm: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>) -> Self {
        Self::with_config(llm, registry, &ClassifierConfig::default())
    }

    pub fn with_config(llm: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>, config: &ClassifierConfig) -> Self {
        Self {
            llm,
            registry,
            timeout: Duration::from_secs(config.timeout_secs),
            history_turns: config.history_turns,
            include_store_data: config.include_store_data,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Classify the latest user message.
    ///
    /// `store_summary` is embedded only when store data inclusion is enabled.
    /// Timeouts and transport failures surface as `ClassificationFailed`;
    /// nothing is retried.
    pub async fn classify(&self, request: &ConversationRequest, store_summary: &str) -> Result<ClassifierOutput> {
        let summary = self.include_store_data.then_some(store_summary);
        let mut messages = vec![ChatMessage::system(classifier_system_prompt(
            &self.registry.definitions(),
            summary,
            request.reasoning_enabled,
        ))];
        for turn in request.history(self.history_turns) {
            if turn.is_user() {
                messages.push(ChatMessage::user(turn.content.clone()));
            } else {
                messages.push(ChatMessage::assistant(turn.content.clone()));
            }
        }
        messages.push(ChatMessage::user(request.utterance()));

        let completion = CompletionRequest::new(messages)
            .with_model(request.model.clone())
            .with_reasoning(request.reasoning_enabled)
            .with_temperature(0.0)
            .json();

        let started = Instant::now();
        let response = match tokio::time::timeout(self.timeout, self.llm.chat(completion)).await {
            Err(_) => {
                return Err(Error::ClassificationFailed(format!(
                    "classification timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
            Ok(Err(e @ (Error::ExternalService { .. } | Error::Timeout(_)))) => {
                return Err(Error::ClassificationFailed(e.to_string()))
            }
            Ok(Err(e)) => return Err(e),
            Ok(Ok(response)) => response,
        };
        let duration = started.elapsed();

        let classification = parse_classification(&response.content, &self.registry)?;
        tracing::info!(
            intent = %classification.intent,
            tool = classification.function_to_call.as_ref().map(|t| t.as_str()).unwrap_or("none"),
            confidence = classification.confidence,
            duration_ms = duration.as_millis() as u64,
            "Classified message"
        );
        Ok(ClassifierOutput {
            classification,
            model: response.model,
            usage: response.usage,
            duration,
        })
    }
}

/// Parse the classifier's JSON reply.
///
/// `function_to_call` and `extracted_params` must both be present (either
/// may be null). A tool the registry does not know becomes a plain
/// conversational turn.
pub fn parse_classification(content: &str, registry: &ToolRegistry) -> Result<Classification> {
    let value: Value = serde_json::from_str(strip_fences(content))
        .map_err(|e| Error::MalformedClassification(format!("reply is not JSON: {}", e)))?;
    let Some(obj) = value.as_object() else {
        return Err(Error::MalformedClassification("reply is not a JSON object".into()));
    };

    let Some(raw_tool) = obj.get("function_to_call") else {
        return Err(Error::MalformedClassification("missing function_to_call".into()));
    };
    let Some(raw_params) = obj.get("extracted_params") else {
        return Err(Error::MalformedClassification("missing extracted_params".into()));
    };

    let function_to_call = match raw_tool {
        Value::Null => None,
        Value::String(s) if matches!(s.trim().to_lowercase().as_str(), "" | "null" | "none") => None,
        Value::String(s) => {
            let name = ToolName::parse(s.trim());
            if name.is_known() && registry.contains(&name) {
                Some(name)
            } else {
                tracing::warn!(tool = %s, "Classifier chose an unregistered tool, treating turn as conversation");
                None
            }
        }
        other => {
            return Err(Error::MalformedClassification(format!(
                "function_to_call must be a string or null, got {}",
                other
            )))
        }
    };

    let extracted_params = match raw_params {
        Value::Null => Map::new(),
        Value::Object(map) => map.clone(),
        other => {
            return Err(Error::MalformedClassification(format!(
                "extracted_params must be an object, got {}",
                other
            )))
        }
    };

    let intent = obj
        .get("intent")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| match &function_to_call {
            Some(tool) => tool.as_str().to_string(),
            None => "conversation".to_string(),
        });

    let confidence = obj
        .get("confidence")
        .and_then(|c| c.as_f64().or_else(|| c.as_str().and_then(|s| s.trim().parse().ok())))
        .map(|c| c.clamp(0.0, 100.0).round() as u8)
        .unwrap_or(50);

    let clarification_question = obj
        .get("clarification_question")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let detected_language = obj
        .get("detected_language")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "en".to_string());

    Ok(Classification {
        intent,
        confidence,
        needs_clarification: obj.get("needs_clarification").and_then(Value::as_bool).unwrap_or(false),
        clarification_question,
        function_to_call,
        extracted_params,
        detected_language,
        reasoning: obj.get("reasoning").and_then(Value::as_str).map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::mocks::MockLlm;
    use concierge_core::ConversationMessage;
    use serde_json::json;

    fn registry() -> Arc<ToolRegistry> {
        Arc::new(ToolRegistry::with_builtin())
    }

    fn request(text: &str) -> ConversationRequest {
        ConversationRequest::new(
            "studio-1",
            vec![
                ConversationMessage::user("hi"),
                ConversationMessage::assistant("Hello! How can I help?"),
                ConversationMessage::user(text),
            ],
        )
    }

    #[test]
    fn test_parse_full_reply() {
        let content = r#"```json
{"intent": "service_search", "confidence": 130, "needs_clarification": false,
 "function_to_call": "search_services", "extracted_params": {"query": "beginner pottery"},
 "detected_language": "EN"}
```"#;
        let c = parse_classification(content, &registry()).unwrap();
        assert_eq!(c.function_to_call, Some(ToolName::SearchServices));
        assert_eq!(c.extracted_params["query"], "beginner pottery");
        assert_eq!(c.confidence, 100);
        assert_eq!(c.detected_language, "en");
    }

    #[test]
    fn test_missing_keys_are_malformed() {
        let err = parse_classification(r#"{"intent": "x", "extracted_params": {}}"#, &registry()).unwrap_err();
        assert!(matches!(err, Error::MalformedClassification(_)));

        let err = parse_classification(r#"{"function_to_call": null}"#, &registry()).unwrap_err();
        assert!(matches!(err, Error::MalformedClassification(_)));

        let err = parse_classification("I think they want pottery", &registry()).unwrap_err();
        assert_eq!(err.code(), "MALFORMED_CLASSIFICATION");
    }

    #[test]
    fn test_defaults_for_optional_fields() {
        let c = parse_classification(r#"{"function_to_call": null, "extracted_params": null}"#, &registry()).unwrap();
        assert_eq!(c.intent, "conversation");
        assert_eq!(c.detected_language, "en");
        assert!(c.extracted_params.is_empty());

        let c = parse_classification(
            r#"{"function_to_call": "get_store_info", "extracted_params": {}}"#,
            &registry(),
        )
        .unwrap();
        assert_eq!(c.intent, "get_store_info");
    }

    #[test]
    fn test_unregistered_tool_becomes_conversation() {
        let c = parse_classification(
            r#"{"intent": "weather", "function_to_call": "get_weather", "extracted_params": {"city": "Lisbon"}}"#,
            &registry(),
        )
        .unwrap();
        assert_eq!(c.function_to_call, None);

        let empty = ToolRegistry::new();
        let c = parse_classification(r#"{"function_to_call": "search_services", "extracted_params": {}}"#, &empty)
            .unwrap();
        assert_eq!(c.function_to_call, None);
    }

    #[tokio::test]
    async fn test_classify_sends_history_and_json_mode() {
        let llm = Arc::new(MockLlm::constant(
            &json!({"intent": "service_search", "confidence": 90, "function_to_call": "search_services",
                    "extracted_params": {"query": "beginner pottery"}})
            .to_string(),
        ));
        let classifier = Classifier::new(llm.clone(), registry());

        let out = classifier
            .classify(&request("do you have pottery classes for beginners"), "Store: studio-1")
            .await
            .unwrap();

        assert_eq!(out.classification.function_to_call, Some(ToolName::SearchServices));
        assert_eq!(out.usage.prompt_tokens, 100);
        assert_eq!(out.model, "mock-model");

        let requests = llm.requests();
        let sent = &requests[0];
        assert!(sent.json_mode);
        assert_eq!(sent.messages.len(), 4);
        assert_eq!(sent.messages[0].role, "system");
        assert!(sent.messages[0].content.contains("Store: studio-1"));
        assert_eq!(sent.messages[3].content, "do you have pottery classes for beginners");
    }

    /// Answers correctly, but only after a minute.
    struct SlowLlm;

    #[async_trait::async_trait]
    impl LlmClient for SlowLlm {
        async fn chat(&self, _request: CompletionRequest) -> Result<concierge_core::LlmResponse> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(MockLlm::text(r#"{"function_to_call": null, "extracted_params": {}}"#))
        }

        fn default_model(&self) -> &str {
            "slow-model"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_model_hits_hard_timeout() {
        let classifier = Classifier::new(Arc::new(SlowLlm), registry());
        let started = tokio::time::Instant::now();

        let err = classifier.classify(&request("hello"), "").await.unwrap_err();

        assert!(matches!(&err, Error::ClassificationFailed(msg) if msg.contains("timed out after 30s")));
        assert_eq!(err.code(), "CLASSIFICATION_FAILED");
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_transport_failure_is_classification_failed() {
        let classifier = Classifier::new(Arc::new(MockLlm::failing(Some(503), "overloaded")), registry());
        let err = classifier.classify(&request("hello"), "").await.unwrap_err();
        assert!(matches!(err, Error::ClassificationFailed(_)));
    }
}
