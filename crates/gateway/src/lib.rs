#![deny(unused)]
//! HTTP gateway for Concierge.
//!
//! This crate exposes both orchestrators over axum, maps engine errors to
//! HTTP statuses and serves health, grading records and Prometheus metrics.

pub mod error;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, GatewayConfig, GatewayServer};
