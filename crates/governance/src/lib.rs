#![deny(unused)]
//! Observability for Concierge.
//!
//! This crate provides:
//! - Tracing subscriber setup with an optional OpenTelemetry exporter
//! - Prometheus metrics helpers for requests, tokens, cost, tools and cache

pub mod metrics;
pub mod tracing_layer;

pub use metrics::{
    setup_metrics_recorder, track_cache_lookup, track_cost, track_request, track_tokens,
    track_tool_call,
};
pub use tracing_layer::configure_tracing;
