#![deny(unused)]
//! Model gateway for Concierge.
//!
//! This crate provides:
//! - An OpenAI-compatible chat-completion client (JSON mode, native tools)
//! - The static pricing table used for cost accounting

pub mod client;
pub mod pricing;

pub use client::{OpenAiCompatClient, OpenAiCompatConfig};
pub use pricing::{ModelPricing, PricingTable};
