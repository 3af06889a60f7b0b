//! Classic pipeline: classify, dispatch, then template or responder.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use concierge_core::{
    Architecture, Classification, ConversationRequest, ConversationResponse, Error, FunctionResult, LlmClient,
    Orchestrator, Result, Stage, ToolName,
};
use concierge_model_gateway::PricingTable;
use concierge_skills::ToolContext;

use crate::classifier::Classifier;
use crate::environment::ToolEnvironment;
use crate::grading::{GradingHandle, GradingJob};
use crate::prompts::store_summary;
use crate::recorder::TraceRecorder;
use crate::responder::{Responder, ResponderInput};
use crate::{suggestions, template};

/// States of one classic request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassicState {
    Classifying,
    Dispatching,
    SkipResponder,
    Responding,
    Done,
    Error,
}

impl ClassicState {
    fn stage(&self) -> Stage {
        match self {
            Self::Classifying => Stage::Routing,
            Self::Dispatching => Stage::ToolExecution,
            Self::SkipResponder | Self::Responding | Self::Done | Self::Error => Stage::Response,
        }
    }
}

impl fmt::Display for ClassicState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Classifying => "classifying",
            Self::Dispatching => "dispatching",
            Self::SkipResponder => "skip_responder",
            Self::Responding => "responding",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Everything produced while walking the states.
#[derive(Default)]
struct Turn {
    classification: Option<Classification>,
    tool: Option<ToolName>,
    args: Value,
    result: Option<FunctionResult>,
    text: Option<String>,
    suggestions: Option<Vec<String>>,
}

/// Borrowed inputs every state handler needs.
struct Scope<'a> {
    request: &'a ConversationRequest,
    ctx: &'a ToolContext,
    summary: &'a str,
}

/// Classify, dispatch at most one tool, then template or respond.
pub struct ClassicOrchestrator {
    env: Arc<ToolEnvironment>,
    classifier: Classifier,
    responder: Responder,
    pricing: Arc<PricingTable>,
    grading: Option<GradingHandle>,
}

impl ClassicOrchestrator {
    pub fn new(env: Arc<ToolEnvironment>, llm: Arc<dyn LlmClient>, pricing: Arc<PricingTable>) -> Self {
        Self {
            classifier: Classifier::new(llm.clone(), env.registry().clone()),
            responder: Responder::new(llm),
            env,
            pricing,
            grading: None,
        }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_responder(mut self, responder: Responder) -> Self {
        self.responder = responder;
        self
    }

    pub fn with_grading(mut self, grading: Option<GradingHandle>) -> Self {
        self.grading = grading;
        self
    }

    /// Run one state and return the next one with a step description.
    async fn advance(
        &self,
        state: ClassicState,
        scope: &Scope<'_>,
        turn: &mut Turn,
        recorder: &mut TraceRecorder,
    ) -> Result<(ClassicState, String)> {
        match state {
            ClassicState::Classifying => {
                let out = self.classifier.classify(scope.request, scope.summary).await?;
                recorder.record_model(Stage::Routing, &out.model, out.usage, out.duration);
                recorder.set_reasoning(out.classification.reasoning.clone());

                let c = out.classification;
                let detail = format!(
                    "intent={} tool={} confidence={}",
                    c.intent,
                    c.function_to_call.as_ref().map(|t| t.as_str()).unwrap_or("none"),
                    c.confidence
                );
                let next = if c.function_to_call.is_some() {
                    ClassicState::Dispatching
                } else {
                    ClassicState::Responding
                };
                turn.tool = c.function_to_call.clone();
                turn.args = c.params_value();
                turn.classification = Some(c);
                Ok((next, detail))
            }
            ClassicState::Dispatching => {
                let tool = turn
                    .tool
                    .clone()
                    .ok_or_else(|| Error::internal("dispatching without a tool"))?;
                let result = self.env.dispatch(&tool, &turn.args, scope.ctx, recorder).await;

                let (next, detail) = if result.skip_responder {
                    (ClassicState::SkipResponder, format!("{} answers directly", tool))
                } else {
                    let started = Instant::now();
                    match template::render(&tool, &result, &turn.args) {
                        Some(text) => {
                            recorder.record_stage(Stage::Response, started.elapsed());
                            turn.text = Some(text);
                            (ClassicState::Done, format!("{} rendered from template", tool))
                        }
                        None => (ClassicState::Responding, format!("{} needs the responder", tool)),
                    }
                };
                turn.result = Some(result);
                Ok((next, detail))
            }
            ClassicState::SkipResponder => {
                let started = Instant::now();
                let text = match (&turn.tool, &turn.result) {
                    (Some(tool), Some(result)) => result
                        .message
                        .clone()
                        .or_else(|| template::render(tool, result, &turn.args))
                        .unwrap_or_default(),
                    _ => String::new(),
                };
                recorder.record_stage(Stage::Response, started.elapsed());
                turn.text = Some(text);
                Ok((ClassicState::Done, "tool message used verbatim".to_string()))
            }
            ClassicState::Responding => {
                let classification = turn
                    .classification
                    .as_ref()
                    .ok_or_else(|| Error::internal("responding without a classification"))?;
                let out = self
                    .responder
                    .respond(ResponderInput {
                        request: scope.request,
                        classification,
                        tool: turn.tool.as_ref(),
                        result: turn.result.as_ref(),
                        store_summary: scope.summary,
                    })
                    .await?;
                recorder.record_model(Stage::Response, &out.model, out.usage, out.duration);
                turn.text = Some(out.text);
                turn.suggestions = Some(out.suggestions);
                Ok((ClassicState::Done, "responder wrote the reply".to_string()))
            }
            ClassicState::Done | ClassicState::Error => Ok((state, String::new())),
        }
    }
}

#[async_trait]
impl Orchestrator for ClassicOrchestrator {
    async fn handle(&self, request: ConversationRequest) -> Result<ConversationResponse> {
        request.validate()?;
        let mut recorder = TraceRecorder::new(Architecture::Classic, self.pricing.clone());
        tracing::info!(trace_id = %recorder.trace_id(), store_id = %request.store_id, "Handling classic request");

        let ctx = self.env.prepare(&request, &mut recorder).await;
        let summary = store_summary(&request.store_id, &ctx.store_data);
        let scope = Scope {
            request: &request,
            ctx: &ctx,
            summary: &summary,
        };

        let mut turn = Turn::default();
        let mut state = ClassicState::Classifying;
        while state != ClassicState::Done {
            match self.advance(state, &scope, &mut turn, &mut recorder).await {
                Ok((next, detail)) => {
                    recorder.step(state.stage(), format!("{} -> {}: {}", state, next, detail));
                    state = next;
                }
                Err(e) => {
                    recorder.step(state.stage(), format!("{} -> {}: {}", state, ClassicState::Error, e.code()));
                    tracing::warn!(
                        trace_id = %recorder.trace_id(),
                        store_id = %request.store_id,
                        state = %state,
                        error = %e,
                        "Classic request failed"
                    );
                    return Err(e);
                }
            }
        }

        let classification = turn
            .classification
            .unwrap_or_else(|| Classification::conversational("conversation"));
        let text = turn.text.unwrap_or_default();
        let suggestions = turn
            .suggestions
            .unwrap_or_else(|| suggestions::for_turn(&classification.intent, turn.tool.as_ref()));
        let ui_components = turn
            .result
            .as_ref()
            .map(|r| r.ui_components.clone())
            .unwrap_or_default();
        let (trace_id, trace) = recorder.finish();

        tracing::info!(
            trace_id = %trace_id,
            store_id = %request.store_id,
            intent = %classification.intent,
            duration_ms = trace.totals.duration_ms,
            cost_usd = trace.totals.cost_usd,
            "Classic request complete"
        );

        if let Some(grading) = &self.grading {
            grading.submit(GradingJob {
                trace_id: trace_id.clone(),
                architecture: Architecture::Classic,
                utterance: request.utterance().to_string(),
                reply: text.clone(),
            });
        }

        Ok(ConversationResponse {
            trace_id,
            text,
            intent: classification.intent,
            function_to_call: classification.function_to_call,
            confidence: classification.confidence,
            function_result: turn.result,
            suggestions,
            ui_components,
            debug: trace,
        })
    }

    fn architecture(&self) -> Architecture {
        Architecture::Classic
    }
}
