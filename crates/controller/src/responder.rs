//! Prose replies written by the model.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

use concierge_core::{
    ChatMessage, Classification, CompletionRequest, ConversationRequest, FunctionResult, LlmClient, LlmUsage, Result,
    ToolName,
};
use concierge_skills::{slim_payload, strip_fences};

use crate::prompts::responder_system_prompt;
use crate::suggestions;

const MAX_WORDS: usize = 120;
const MAX_SUGGESTIONS: usize = 3;

/// What the responder needs to write one reply.
pub struct ResponderInput<'a> {
    pub request: &'a ConversationRequest,
    pub classification: &'a Classification,
    pub tool: Option<&'a ToolName>,
    pub result: Option<&'a FunctionResult>,
    pub store_summary: &'a str,
}

#[derive(Debug, Clone)]
pub struct ResponderOutput {
    pub text: String,
    pub suggestions: Vec<String>,
    pub model: String,
    pub usage: LlmUsage,
    pub duration: Duration,
}

pub struct Responder {
    llm: Arc<dyn LlmClient>,
    history_turns: usize,
}

impl Responder {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm, history_turns: 6 }
    }

    pub fn with_history_turns(mut self, turns: usize) -> Self {
        self.history_turns = turns;
        self
    }

    /// Write the reply. Transport failures propagate unchanged.
    pub async fn respond(&self, input: ResponderInput<'_>) -> Result<ResponderOutput> {
        let mut messages = vec![ChatMessage::system(responder_system_prompt(input.store_summary, MAX_WORDS))];
        for turn in input.request.history(self.history_turns) {
            if turn.is_user() {
                messages.push(ChatMessage::user(turn.content.clone()));
            } else {
                messages.push(ChatMessage::assistant(turn.content.clone()));
            }
        }
        messages.push(ChatMessage::user(turn_brief(&input)));

        let completion = CompletionRequest::new(messages)
            .with_model(input.request.model.clone())
            .with_temperature(0.4)
            .json();

        let started = Instant::now();
        let response = self.llm.chat(completion).await?;
        let duration = started.elapsed();

        let (text, suggestions) = match parse_reply(&response.content) {
            Some(parsed) => parsed,
            None => {
                tracing::debug!("Responder reply was not JSON, using it verbatim");
                (response.content.trim().to_string(), Vec::new())
            }
        };
        let suggestions = if suggestions.is_empty() {
            suggestions::for_turn(&input.classification.intent, input.tool)
        } else {
            suggestions
        };

        Ok(ResponderOutput {
            text,
            suggestions,
            model: response.model,
            usage: response.usage,
            duration,
        })
    }
}

/// The final user turn: the utterance plus everything the model should use.
fn turn_brief(input: &ResponderInput<'_>) -> String {
    let c = input.classification;
    let classification = json!({
        "intent": c.intent,
        "detected_language": c.detected_language,
        "needs_clarification": c.needs_clarification,
        "clarification_question": c.clarification_question,
    });
    let mut brief = format!(
        "Customer message: {}\n\nClassification: {}",
        input.request.utterance(),
        classification
    );

    if let (Some(tool), Some(result)) = (input.tool, input.result) {
        let payload = json!({
            "success": result.success,
            "error": result.error,
            "message": result.message,
            "validation_errors": result.validation_errors,
            "data": result.data.as_ref().map(|d| slim_payload(tool, d)),
        });
        brief.push_str(&format!("\n\nTool result ({}): {}", tool, payload));
    }
    brief
}

/// Parse `{"response": ..., "suggestions": [...]}`.
fn parse_reply(content: &str) -> Option<(String, Vec<String>)> {
    let value: Value = serde_json::from_str(strip_fences(content)).ok()?;
    let text = value.get("response")?.as_str()?.trim().to_string();
    let suggestions = value
        .get("suggestions")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .take(MAX_SUGGESTIONS)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Some((text, suggestions))
}
