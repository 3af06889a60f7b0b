#![deny(unused)]
//! Business tools for Concierge.
//!
//! This crate provides:
//! - The tool registry and validated dispatch
//! - The eight built-in business tools (info, search, leads, booking)
//! - The semantic matcher used by search and recommendation
//! - Payload slimming for prompt embedding
//! - The HTTP calendar adapter

pub mod builtin;
pub mod calendar;
pub mod context;
pub mod matcher;
pub mod records;
pub mod registry;
pub mod slim;
pub mod tool;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use calendar::HttpCalendarService;
pub use context::{ModelUsage, ToolContext, UsageMeter};
pub use matcher::{lexical_score, strip_fences, truncate, Matchable, ScoredMatch, SemanticMatcher};
pub use records::{find_service, HoursRecord, ProductRecord, ServiceRecord};
pub use registry::ToolRegistry;
pub use slim::slim_payload;
pub use tool::BusinessTool;
pub use validation::{FieldKind, FieldSpec};
