//! Metrics implementation using Prometheus.

use concierge_core::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize Prometheus recorder and return the handle.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::Configuration(format!("Failed to install Prometheus recorder: {}", e)))?;

    tracing::info!("Prometheus metrics recorder initialized");
    Ok(handle)
}

/// Track one HTTP request (count and latency).
pub fn track_request(method: &str, path: &str, status: u16, latency_sec: f64) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(latency_sec);
}

/// Track token usage of one completion call.
pub fn track_tokens(model: &str, stage: &str, prompt: u64, completion: u64) {
    metrics::counter!(
        "llm_token_usage_total",
        "model" => model.to_string(),
        "stage" => stage.to_string(),
        "type" => "prompt"
    )
    .increment(prompt);
    metrics::counter!(
        "llm_token_usage_total",
        "model" => model.to_string(),
        "stage" => stage.to_string(),
        "type" => "completion"
    )
    .increment(completion);
}

/// Track estimated spend in USD.
pub fn track_cost(model: &str, stage: &str, usd: f64) {
    // Counters are integral; cost is accumulated in micro-dollars.
    let micros = (usd * 1_000_000.0).round().max(0.0) as u64;
    metrics::counter!(
        "llm_cost_microdollars_total",
        "model" => model.to_string(),
        "stage" => stage.to_string()
    )
    .increment(micros);
}

/// Track one tool execution.
pub fn track_tool_call(tool: &str, success: bool, duration_sec: f64) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!(
        "tool_calls_total",
        "tool" => tool.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("tool_call_duration_seconds", "tool" => tool.to_string()).record(duration_sec);
}

/// Track one cache lookup.
pub fn track_cache_lookup(strategy: &str, hit: bool) {
    let name = if hit { "cache_hits_total" } else { "cache_misses_total" };
    metrics::counter!(name, "strategy" => strategy.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_without_recorder_are_noops() {
        track_request("POST", "/v1/chat", 200, 0.12);
        track_tokens("gpt-4o-mini", "routing", 120, 30);
        track_cost("gpt-4o-mini", "routing", 0.000036);
        track_tool_call("search_services", true, 0.01);
        track_cache_lookup("database", false);
    }
}
