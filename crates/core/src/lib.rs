#![deny(unused)]
//! Core types, traits, and error definitions for Concierge.
//!
//! This crate provides the building blocks shared by every layer of the
//! orchestration engine: request/response shapes, tool results, the trace
//! schema, the external-service seams and the configuration model.

pub mod config;
pub mod error;
pub mod mocks;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::*;
pub use types::*;
