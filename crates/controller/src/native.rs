//! Native tool-calling loop.
//!
//! The model sees every tool schema and decides itself which to call. Each
//! iteration either selects tools, whose slimmed results are fed back, or
//! answers in plain text, which ends the loop.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use concierge_core::config::NativeLoopConfig;
use concierge_core::{
    Architecture, ChatMessage, CompletionRequest, ConversationRequest, ConversationResponse, Error, FunctionResult,
    LlmClient, Orchestrator, Result, Stage, ToolName,
};
use concierge_model_gateway::PricingTable;
use concierge_skills::slim_payload;

use crate::environment::ToolEnvironment;
use crate::grading::{GradingHandle, GradingJob};
use crate::prompts::{native_system_prompt, store_summary};
use crate::recorder::TraceRecorder;
use crate::suggestions;

/// Bounded loop where the model drives tool selection.
pub struct NativeOrchestrator {
    env: Arc<ToolEnvironment>,
    llm: Arc<dyn LlmClient>,
    pricing: Arc<PricingTable>,
    max_iterations: usize,
    history_turns: usize,
    grading: Option<GradingHandle>,
}

impl NativeOrchestrator {
    pub fn new(env: Arc<ToolEnvironment>, llm: Arc<dyn LlmClient>, pricing: Arc<PricingTable>) -> Self {
        Self {
            env,
            llm,
            pricing,
            max_iterations: NativeLoopConfig::default().max_iterations,
            history_turns: 6,
            grading: None,
        }
    }

    pub fn with_config(mut self, config: &NativeLoopConfig) -> Self {
        self.max_iterations = config.max_iterations.max(1);
        self
    }

    pub fn with_history_turns(mut self, turns: usize) -> Self {
        self.history_turns = turns;
        self
    }

    pub fn with_grading(mut self, grading: Option<GradingHandle>) -> Self {
        self.grading = grading;
        self
    }

    fn finish(
        &self,
        request: &ConversationRequest,
        recorder: TraceRecorder,
        text: String,
        last: Option<(ToolName, FunctionResult)>,
    ) -> ConversationResponse {
        let (tool, result) = match last {
            Some((tool, result)) => (Some(tool), Some(result)),
            None => (None, None),
        };
        let intent = tool
            .as_ref()
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| "conversation".to_string());
        let ui_components = result.as_ref().map(|r| r.ui_components.clone()).unwrap_or_default();
        let (trace_id, trace) = recorder.finish();

        tracing::info!(
            trace_id = %trace_id,
            store_id = %request.store_id,
            tool_calls = trace.tool_calls.len(),
            duration_ms = trace.totals.duration_ms,
            cost_usd = trace.totals.cost_usd,
            "Native request complete"
        );

        if let Some(grading) = &self.grading {
            grading.submit(GradingJob {
                trace_id: trace_id.clone(),
                architecture: Architecture::Native,
                utterance: request.utterance().to_string(),
                reply: text.clone(),
            });
        }

        ConversationResponse {
            trace_id,
            suggestions: suggestions::for_turn(&intent, tool.as_ref()),
            text,
            intent,
            function_to_call: tool.filter(ToolName::is_known),
            confidence: 100,
            function_result: result,
            ui_components,
            debug: trace,
        }
    }
}

/// Tool-result message content: the outcome with a slimmed payload.
fn tool_message(tool: &ToolName, result: &FunctionResult) -> String {
    json!({
        "success": result.success,
        "error": result.error,
        "message": result.message,
        "validation_errors": result.validation_errors,
        "awaiting_input": result.awaiting_input,
        "data": result.data.as_ref().map(|d| slim_payload(tool, d)),
    })
    .to_string()
}

#[async_trait]
impl Orchestrator for NativeOrchestrator {
    async fn handle(&self, request: ConversationRequest) -> Result<ConversationResponse> {
        request.validate()?;
        let mut recorder = TraceRecorder::new(Architecture::Native, self.pricing.clone());
        tracing::info!(trace_id = %recorder.trace_id(), store_id = %request.store_id, "Handling native request");

        let ctx = self.env.prepare(&request, &mut recorder).await;
        let summary = store_summary(&request.store_id, &ctx.store_data);

        let mut messages = vec![ChatMessage::system(native_system_prompt(&summary))];
        for turn in request.history(self.history_turns) {
            if turn.is_user() {
                messages.push(ChatMessage::user(turn.content.clone()));
            } else {
                messages.push(ChatMessage::assistant(turn.content.clone()));
            }
        }
        messages.push(ChatMessage::user(request.utterance()));

        let tools = self.env.registry().definitions();
        let mut last: Option<(ToolName, FunctionResult)> = None;

        for iteration in 1..=self.max_iterations {
            let completion = CompletionRequest::new(messages.clone())
                .with_model(request.model.clone())
                .with_tools(tools.clone())
                .with_reasoning(request.reasoning_enabled);

            let started = Instant::now();
            let response = match self.llm.chat(completion).await {
                Ok(response) => response,
                Err(e) => {
                    recorder.step(Stage::Routing, format!("iteration {} failed: {}", iteration, e.code()));
                    tracing::warn!(trace_id = %recorder.trace_id(), iteration, error = %e, "Native request failed");
                    return Err(e);
                }
            };
            let duration = started.elapsed();

            if !response.has_tool_calls() {
                recorder.record_model(Stage::Response, &response.model, response.usage, duration);
                recorder.step(Stage::Response, format!("iteration {}: final answer", iteration));
                let text = response.content.trim().to_string();
                return Ok(self.finish(&request, recorder, text, last));
            }

            recorder.record_model(Stage::Routing, &response.model, response.usage, duration);
            let names: Vec<&str> = response.tool_calls.iter().map(|c| c.name.as_str()).collect();
            recorder.step(Stage::Routing, format!("iteration {}: selected {}", iteration, names.join(", ")));
            tracing::debug!(iteration, tools = %names.join(","), "Model selected tools");

            messages.push(ChatMessage::assistant_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));
            for call in &response.tool_calls {
                let tool = ToolName::parse(&call.name);
                let result = self.env.dispatch(&tool, &call.arguments, &ctx, &mut recorder).await;
                if result.skip_responder {
                    recorder.step(Stage::Response, format!("{} answers directly", tool));
                    let text = result.message.clone().unwrap_or_default();
                    return Ok(self.finish(&request, recorder, text, Some((tool, result))));
                }
                messages.push(ChatMessage::tool(call.id.clone(), tool_message(&tool, &result)));
                last = Some((tool, result));
            }
        }

        recorder.step(
            Stage::Routing,
            format!("iteration cap of {} reached", self.max_iterations),
        );
        tracing::warn!(
            trace_id = %recorder.trace_id(),
            store_id = %request.store_id,
            limit = self.max_iterations,
            "Native loop hit its iteration cap"
        );
        Err(Error::BudgetExceeded {
            used: self.max_iterations,
            limit: self.max_iterations,
        })
    }

    fn architecture(&self) -> Architecture {
        Architecture::Native
    }
}
