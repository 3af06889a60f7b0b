//! Core traits for Concierge.
//!
//! Traits are organized by the seam they cover:
//! - `llm`: hosted completion service (LlmClient)
//! - `store`: cache backends and the tab service (CacheStore, TabSource)
//! - `calendar`: external scheduling service (CalendarService)
//! - `controller`: request orchestration (Orchestrator)

pub mod calendar;
pub mod controller;
pub mod llm;
pub mod store;

pub use calendar::*;
pub use controller::*;
pub use llm::*;
pub use store::*;
