//! Background quality grading of produced replies.
//!
//! The response path only ever calls [`GradingHandle::submit`], which never
//! waits: jobs go over a bounded channel to a detached worker that asks the
//! model for a 1-10 score and stores it in [`TraceRecords`].

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use concierge_core::{Architecture, ChatMessage, CompletionRequest, Error, LlmClient, Result};
use concierge_skills::strip_fences;

use crate::prompts::{grading_input, GRADING_PROMPT};

/// One reply waiting to be graded.
#[derive(Debug, Clone)]
pub struct GradingJob {
    pub trace_id: String,
    pub architecture: Architecture,
    pub utterance: String,
    pub reply: String,
}

/// Outcome of grading one reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceRecord {
    pub trace_id: String,
    pub architecture: Architecture,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub graded_at: DateTime<Utc>,
}

/// Records kept when no limit is configured.
pub const DEFAULT_MAX_RECORDS: usize = 10_000;

/// Grading results keyed by trace id. Only the worker writes.
///
/// Holds at most `max_records` entries; the oldest graded record is evicted
/// first.
#[derive(Debug)]
pub struct TraceRecords {
    records: DashMap<String, TraceRecord>,
    order: Mutex<VecDeque<String>>,
    max_records: usize,
}

impl Default for TraceRecords {
    fn default() -> Self {
        Self::with_max_records(DEFAULT_MAX_RECORDS)
    }
}

impl TraceRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_records(max_records: usize) -> Self {
        Self {
            records: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            max_records: max_records.max(1),
        }
    }

    pub fn get(&self, trace_id: &str) -> Option<TraceRecord> {
        self.records.get(trace_id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn insert(&self, record: TraceRecord) {
        let trace_id = record.trace_id.clone();
        let Ok(mut order) = self.order.lock() else {
            tracing::warn!(trace_id = %trace_id, "Grading records lock poisoned, dropping record");
            return;
        };
        if self.records.insert(trace_id.clone(), record).is_none() {
            order.push_back(trace_id);
        }
        while order.len() > self.max_records {
            if let Some(oldest) = order.pop_front() {
                self.records.remove(&oldest);
            }
        }
    }
}

/// Sending side of the grading queue.
#[derive(Clone)]
pub struct GradingHandle {
    sender: mpsc::Sender<GradingJob>,
}

impl GradingHandle {
    /// Queue a job without waiting. Returns false when the job was dropped.
    pub fn submit(&self, job: GradingJob) -> bool {
        match self.sender.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                tracing::warn!(trace_id = %job.trace_id, "Grading queue full, dropping job");
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                tracing::warn!(trace_id = %job.trace_id, "Grading worker stopped, dropping job");
                false
            }
        }
    }
}

/// Grades replies with a completion model.
pub struct GradingWorker {
    llm: Arc<dyn LlmClient>,
    records: Arc<TraceRecords>,
    model: Option<String>,
}

impl GradingWorker {
    pub fn new(llm: Arc<dyn LlmClient>, records: Arc<TraceRecords>) -> Self {
        Self {
            llm,
            records,
            model: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Start the worker on its own task.
    pub fn spawn(self, queue_size: usize) -> (GradingHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(queue_size.max(1));
        let task = tokio::spawn(self.run(receiver));
        (GradingHandle { sender }, task)
    }

    async fn run(self, mut receiver: mpsc::Receiver<GradingJob>) {
        tracing::info!("Grading worker started");
        while let Some(job) = receiver.recv().await {
            let record = self.grade(job).await;
            self.records.insert(record);
        }
        tracing::info!("Grading worker stopped");
    }

    /// Grade one reply. Failures are recorded rather than returned.
    pub async fn grade(&self, job: GradingJob) -> TraceRecord {
        let mut record = TraceRecord {
            trace_id: job.trace_id.clone(),
            architecture: job.architecture,
            score: None,
            rationale: None,
            error: None,
            model: None,
            graded_at: Utc::now(),
        };

        let request = CompletionRequest::new(vec![
            ChatMessage::system(GRADING_PROMPT),
            ChatMessage::user(grading_input(&job.utterance, &job.reply)),
        ])
        .with_model(self.model.clone())
        .with_temperature(0.0)
        .json();

        match self.llm.chat(request).await.and_then(|r| parse_grade(&r.content).map(|g| (g, r.model))) {
            Ok(((score, rationale), model)) => {
                tracing::debug!(trace_id = %job.trace_id, score, "Graded reply");
                record.score = Some(score);
                record.rationale = rationale;
                record.model = Some(model);
            }
            Err(e) => {
                tracing::warn!(trace_id = %job.trace_id, error = %e, "Grading failed");
                record.error = Some(e.to_string());
            }
        }
        record
    }
}

fn parse_grade(content: &str) -> Result<(u8, Option<String>)> {
    let value: Value = serde_json::from_str(strip_fences(content))
        .map_err(|e| Error::MalformedModelOutput(format!("grade is not JSON: {}", e)))?;
    let score = value
        .get("score")
        .and_then(|s| s.as_f64().or_else(|| s.as_str().and_then(|s| s.trim().parse().ok())))
        .ok_or_else(|| Error::MalformedModelOutput("grade has no score".into()))?;
    let rationale = value
        .get("rationale")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    Ok((score.round().clamp(1.0, 10.0) as u8, rationale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::mocks::MockLlm;

    fn job(id: &str) -> GradingJob {
        GradingJob {
            trace_id: id.to_string(),
            architecture: Architecture::Classic,
            utterance: "do you have pottery classes?".into(),
            reply: "Yes, Pottery Basics runs on Mondays.".into(),
        }
    }

    #[test]
    fn test_parse_grade_clamps() {
        assert_eq!(parse_grade(r#"{"score": 14, "rationale": "great"}"#).unwrap(), (10, Some("great".into())));
        assert_eq!(parse_grade(r#"{"score": "0"}"#).unwrap(), (1, None));
        assert!(parse_grade("nine out of ten").is_err());
    }

    #[tokio::test]
    async fn test_failed_grade_is_recorded() {
        let worker = GradingWorker::new(Arc::new(MockLlm::failing(None, "down")), Arc::new(TraceRecords::new()));
        let record = worker.grade(job("t-1")).await;
        assert_eq!(record.score, None);
        assert!(record.error.unwrap().contains("down"));
    }

    #[tokio::test]
    async fn test_worker_writes_records() {
        let records = Arc::new(TraceRecords::new());
        let llm = Arc::new(MockLlm::constant(r#"{"score": 8, "rationale": "Accurate and friendly."}"#));
        let (handle, task) = GradingWorker::new(llm, records.clone()).spawn(4);

        assert!(handle.submit(job("t-1")));
        drop(handle);
        task.await.unwrap();

        let record = records.get("t-1").unwrap();
        assert_eq!(record.score, Some(8));
        assert_eq!(record.rationale.as_deref(), Some("Accurate and friendly."));
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_records_are_bounded() {
        let records = Arc::new(TraceRecords::with_max_records(2));
        let llm = Arc::new(MockLlm::constant(r#"{"score": 6}"#));
        let (handle, task) = GradingWorker::new(llm, records.clone()).spawn(8);

        for id in ["t-1", "t-2", "t-3"] {
            assert!(handle.submit(job(id)));
        }
        drop(handle);
        task.await.unwrap();

        assert_eq!(records.len(), 2);
        assert!(records.get("t-1").is_none());
        assert_eq!(records.get("t-3").unwrap().score, Some(6));
    }

    #[tokio::test]
    async fn test_full_queue_drops_job() {
        let (sender, _receiver) = mpsc::channel(1);
        let handle = GradingHandle { sender };
        assert!(handle.submit(job("t-1")));
        assert!(!handle.submit(job("t-2")));
    }
}
