//! Per-request trace and cost accounting.

use std::sync::Arc;
use std::time::{Duration, Instant};

use concierge_core::{
    Architecture, DebugTrace, LlmUsage, Stage, StageMetrics, ToolCallTrace, TraceStep, TraceTotals,
};
use concierge_governance::metrics::{track_cost, track_tokens};
use concierge_model_gateway::PricingTable;
use concierge_skills::ModelUsage;

/// Builds the [`DebugTrace`] attached to a response.
///
/// One recorder lives for exactly one request; stages and steps are appended
/// in the order they happen.
pub struct TraceRecorder {
    trace_id: String,
    started: Instant,
    pricing: Arc<PricingTable>,
    trace: DebugTrace,
    seq: u32,
}

impl TraceRecorder {
    pub fn new(architecture: Architecture, pricing: Arc<PricingTable>) -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            started: Instant::now(),
            pricing,
            trace: DebugTrace::new(architecture),
            seq: 0,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Append a state transition.
    pub fn step(&mut self, stage: Stage, detail: impl Into<String>) {
        self.seq += 1;
        let detail = detail.into();
        tracing::debug!(trace_id = %self.trace_id, seq = self.seq, stage = stage.as_str(), detail = %detail, "Trace step");
        self.trace.steps.push(TraceStep {
            seq: self.seq,
            stage,
            detail,
            at_ms: self.elapsed_ms(),
        });
    }

    /// Record a stage that made no model call.
    pub fn record_stage(&mut self, stage: Stage, duration: Duration) {
        self.trace.stages.push(StageMetrics {
            stage,
            model: None,
            duration_ms: duration.as_millis() as u64,
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: 0.0,
        });
    }

    /// Record one model call and return its cost in USD.
    pub fn record_model(&mut self, stage: Stage, model: &str, usage: LlmUsage, duration: Duration) -> f64 {
        let cost = self.pricing.cost(model, usage.prompt_tokens, usage.completion_tokens);
        track_tokens(model, stage.as_str(), usage.prompt_tokens as u64, usage.completion_tokens as u64);
        track_cost(model, stage.as_str(), cost);
        self.trace.stages.push(StageMetrics {
            stage,
            model: Some(model.to_string()),
            duration_ms: duration.as_millis() as u64,
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            cost_usd: cost,
        });
        cost
    }

    /// Record model calls made inside tool handlers (semantic ranking).
    ///
    /// Their wall time is already part of the tool-execution stage, so they
    /// contribute tokens and cost only.
    pub fn record_tool_usage(&mut self, usage: Vec<ModelUsage>) {
        for entry in usage {
            self.record_model(Stage::ToolExecution, &entry.model, entry.usage, Duration::ZERO);
        }
    }

    pub fn record_tool(&mut self, call: ToolCallTrace) {
        self.trace.tool_calls.push(call);
    }

    pub fn set_reasoning(&mut self, reasoning: Option<String>) {
        if reasoning.is_some() {
            self.trace.reasoning = reasoning;
        }
    }

    /// Close the trace and compute its totals.
    pub fn finish(mut self) -> (String, DebugTrace) {
        let mut totals = self.trace.stages.iter().fold(TraceTotals::default(), |mut acc, s| {
            acc.input_tokens += s.input_tokens;
            acc.output_tokens += s.output_tokens;
            acc.cost_usd += s.cost_usd;
            acc
        });
        totals.duration_ms = self.elapsed_ms();
        self.trace.totals = totals;
        (self.trace_id, self.trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_model_gateway::ModelPricing;

    fn pricing() -> Arc<PricingTable> {
        let mut table = PricingTable::new("test-model");
        table.register(ModelPricing::new("test-model", 1.0, 2.0));
        Arc::new(table)
    }

    fn usage(prompt: u32, completion: u32) -> LlmUsage {
        LlmUsage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        }
    }

    #[test]
    fn test_steps_are_numbered_in_order() {
        let mut recorder = TraceRecorder::new(Architecture::Classic, pricing());
        recorder.step(Stage::DataLoad, "loaded");
        recorder.step(Stage::Routing, "classified");
        let (_, trace) = recorder.finish();

        let seqs: Vec<u32> = trace.steps.iter().map(|s| s.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
        assert_eq!(trace.steps[1].stage, Stage::Routing);
    }

    #[test]
    fn test_totals_sum_every_stage() {
        let mut recorder = TraceRecorder::new(Architecture::Native, pricing());
        let routing = recorder.record_model(Stage::Routing, "test-model", usage(1_000_000, 0), Duration::from_millis(5));
        recorder.record_tool_usage(vec![ModelUsage {
            model: "unknown-model".into(),
            usage: usage(0, 1_000_000),
        }]);
        recorder.record_stage(Stage::DataLoad, Duration::from_millis(3));
        let (trace_id, trace) = recorder.finish();

        assert!(!trace_id.is_empty());
        assert!((routing - 1.0).abs() < 1e-9);
        assert_eq!(trace.stages.len(), 3);
        assert_eq!(trace.totals.input_tokens, 1_000_000);
        assert_eq!(trace.totals.output_tokens, 1_000_000);
        // Unknown models are charged at the default model's rate.
        assert!((trace.totals.cost_usd - 3.0).abs() < 1e-9);
        assert_eq!(trace.stage_total(Stage::ToolExecution).output_tokens, 1_000_000);
    }
}
