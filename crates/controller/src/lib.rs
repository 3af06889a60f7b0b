#![deny(unused)]
//! Orchestration for Concierge.
//!
//! This crate provides the two request pipelines and what they share:
//! - The classic state machine (classifier, dispatch, template or responder)
//! - The native tool-calling loop with an iteration cap
//! - Trace and cost recording
//! - The background grading worker

pub mod builder;
pub mod classic;
pub mod classifier;
pub mod environment;
pub mod grading;
pub mod native;
pub mod prompts;
pub mod recorder;
pub mod responder;
pub mod suggestions;
pub mod template;

pub use builder::{Concierge, ConciergeBuilder};
pub use classic::{ClassicOrchestrator, ClassicState};
pub use classifier::{parse_classification, Classifier, ClassifierOutput};
pub use environment::ToolEnvironment;
pub use grading::{GradingHandle, GradingJob, GradingWorker, TraceRecord, TraceRecords};
pub use native::NativeOrchestrator;
pub use prompts::CLASSIFIER_PROMPT_VERSION;
pub use recorder::TraceRecorder;
pub use responder::{Responder, ResponderInput, ResponderOutput};
