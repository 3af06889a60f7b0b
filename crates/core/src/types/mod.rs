//! Core type definitions for Concierge.
//!
//! This module contains the data structures that flow through a single
//! request: the inbound conversation, the classification, tool results,
//! the per-request store snapshot and the debug/cost trace.

pub mod calendar;
pub mod classification;
pub mod conversation;
pub mod function_result;
pub mod store;
pub mod tool;
pub mod trace;

pub use calendar::*;
pub use classification::*;
pub use conversation::*;
pub use function_result::*;
pub use store::*;
pub use tool::*;
pub use trace::*;
