use serde::{Deserialize, Serialize};

use super::conversation::Architecture;
use super::tool::ToolCallTrace;

// =============================================================================
// Debug / Cost Trace
// =============================================================================

/// Canonical pipeline stages shared by both orchestrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Intent classification, or a native iteration that selected tools.
    Routing,
    ToolExecution,
    /// Responder call, template render, or the final native iteration.
    Response,
    DataLoad,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Routing => "routing",
            Self::ToolExecution => "tool_execution",
            Self::Response => "response",
            Self::DataLoad => "data_load",
        }
    }
}

/// Timing and cost of one stage execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageMetrics {
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub duration_ms: u64,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost_usd: f64,
}

/// One state transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceStep {
    pub seq: u32,
    pub stage: Stage,
    pub detail: String,
    /// Milliseconds since the request started.
    pub at_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TraceTotals {
    pub duration_ms: u64,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost_usd: f64,
}

/// Instrumentation attached to every response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugTrace {
    pub architecture: Architecture,
    pub stages: Vec<StageMetrics>,
    pub tool_calls: Vec<ToolCallTrace>,
    pub steps: Vec<TraceStep>,
    pub totals: TraceTotals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl DebugTrace {
    pub fn new(architecture: Architecture) -> Self {
        Self {
            architecture,
            stages: Vec::new(),
            tool_calls: Vec::new(),
            steps: Vec::new(),
            totals: TraceTotals::default(),
            reasoning: None,
        }
    }

    /// Sum of every stage for the given kind.
    pub fn stage_total(&self, stage: Stage) -> TraceTotals {
        self.stages
            .iter()
            .filter(|s| s.stage == stage)
            .fold(TraceTotals::default(), |mut acc, s| {
                acc.duration_ms += s.duration_ms;
                acc.input_tokens += s.input_tokens;
                acc.output_tokens += s.output_tokens;
                acc.cost_usd += s.cost_usd;
                acc
            })
    }
}
