//! Mock implementations of core traits for testing.
//!
//! These mocks are shared by the unit and integration tests of every crate:
//! a scripted completion client, an in-memory tab service and an in-memory
//! calendar.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::{
    traits::{CalendarService, ChatMessage, CompletionRequest, LlmClient, LlmResponse, LlmUsage, TabContents, TabSource},
    types::{CalendarEvent, NewCalendarEvent, Row, ToolCall},
    Error, Result,
};

// =============================================================================
// Mock LLM Client
// =============================================================================

/// Scripted mock completion client.
///
/// Responses are consumed in order; once the queue is empty the last
/// response is repeated. Every request is recorded for assertions.
pub struct MockLlm {
    responses: Mutex<VecDeque<LlmResponse>>,
    last: Mutex<Option<LlmResponse>>,
    requests: Mutex<Vec<CompletionRequest>>,
    failure: Mutex<Option<(Option<u16>, String)>>,
    model: String,
}

impl MockLlm {
    /// Create a new mock with a queue of responses.
    pub fn new(responses: Vec<LlmResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            model: "mock-model".to_string(),
        }
    }

    /// Create a mock that replies with plain text contents in order.
    pub fn with_texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Self::text(t)).collect())
    }

    /// Create a mock that always returns the same text.
    pub fn constant(text: &str) -> Self {
        Self::with_texts(&[text])
    }

    /// Create a mock whose every call fails with an external-service error.
    pub fn failing(status: Option<u16>, message: &str) -> Self {
        let mock = Self::new(Vec::new());
        if let Ok(mut failure) = mock.failure.lock() {
            *failure = Some((status, message.to_string()));
        }
        mock
    }

    /// A plain text response.
    pub fn text(content: &str) -> LlmResponse {
        LlmResponse {
            content: content.to_string(),
            finish_reason: "stop".to_string(),
            usage: LlmUsage {
                prompt_tokens: 100,
                completion_tokens: 20,
                total_tokens: 120,
            },
            tool_calls: Vec::new(),
            model: "mock-model".to_string(),
        }
    }

    /// A response selecting one tool.
    pub fn tool_call(id: &str, name: &str, arguments: Value) -> LlmResponse {
        Self::tool_calls(vec![ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments,
        }])
    }

    /// A response selecting several tools.
    pub fn tool_calls(calls: Vec<ToolCall>) -> LlmResponse {
        LlmResponse {
            content: String::new(),
            finish_reason: "tool_calls".to_string(),
            tool_calls: calls,
            ..Self::text("")
        }
    }

    /// Number of calls made to this mock.
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Messages of the most recent request.
    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.requests()
            .last()
            .map(|r| r.messages.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn chat(&self, request: CompletionRequest) -> Result<LlmResponse> {
        self.requests
            .lock()
            .map_err(|e| Error::internal(e.to_string()))?
            .push(request);

        if let Some((status, message)) = self
            .failure
            .lock()
            .map_err(|e| Error::internal(e.to_string()))?
            .clone()
        {
            return Err(Error::external("completion", status, message));
        }

        let next = self
            .responses
            .lock()
            .map_err(|e| Error::internal(e.to_string()))?
            .pop_front();
        let mut last = self.last.lock().map_err(|e| Error::internal(e.to_string()))?;
        match next {
            Some(response) => {
                *last = Some(response.clone());
                Ok(response)
            }
            None => last
                .clone()
                .ok_or_else(|| Error::internal("MockLlm has no scripted responses")),
        }
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}

// =============================================================================
// Mock Tab Source
// =============================================================================

/// In-memory tab service.
#[derive(Default)]
pub struct MockTabSource {
    tabs: Mutex<HashMap<String, TabContents>>,
    fetches: Mutex<Vec<String>>,
    appended: Mutex<Vec<(String, Row)>>,
}

impl MockTabSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a tab. Headers are taken from the first row when not given.
    pub fn with_tab(self, title: &str, headers: &[&str], rows: Vec<Value>) -> Self {
        let rows: Vec<Row> = rows.into_iter().filter_map(|v| v.as_object().cloned()).collect();
        let headers = if headers.is_empty() {
            rows.first().map(|r| r.keys().cloned().collect()).unwrap_or_default()
        } else {
            headers.iter().map(|h| h.to_string()).collect()
        };
        if let Ok(mut tabs) = self.tabs.lock() {
            tabs.insert(title.to_string(), TabContents { headers, rows });
        }
        self
    }

    /// Titles passed to `fetch_tab`, in call order.
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().map(|f| f.clone()).unwrap_or_default()
    }

    /// Rows appended so far, with their tab title.
    pub fn appended(&self) -> Vec<(String, Row)> {
        self.appended.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TabSource for MockTabSource {
    async fn list_tabs(&self, _store_id: &str) -> Result<Vec<String>> {
        let tabs = self.tabs.lock().map_err(|e| Error::internal(e.to_string()))?;
        let mut titles: Vec<String> = tabs.keys().cloned().collect();
        titles.sort();
        Ok(titles)
    }

    async fn fetch_tab(&self, _store_id: &str, tab: &str) -> Result<TabContents> {
        self.fetches
            .lock()
            .map_err(|e| Error::internal(e.to_string()))?
            .push(tab.to_string());
        self.tabs
            .lock()
            .map_err(|e| Error::internal(e.to_string()))?
            .get(tab)
            .cloned()
            .ok_or_else(|| Error::external("tabs", Some(404), format!("tab '{}' not found", tab)))
    }

    async fn append_row(&self, _store_id: &str, tab: &str, row: Row) -> Result<()> {
        let mut tabs = self.tabs.lock().map_err(|e| Error::internal(e.to_string()))?;
        let contents = tabs
            .get_mut(tab)
            .ok_or_else(|| Error::external("tabs", Some(404), format!("tab '{}' not found", tab)))?;
        contents.rows.push(row.clone());
        self.appended
            .lock()
            .map_err(|e| Error::internal(e.to_string()))?
            .push((tab.to_string(), row));
        Ok(())
    }
}

// =============================================================================
// Mock Calendar
// =============================================================================

/// In-memory calendar. Ids are assigned sequentially.
#[derive(Default)]
pub struct MockCalendar {
    events: Mutex<Vec<CalendarEvent>>,
    shares: Mutex<Vec<(String, String)>>,
}

impl MockCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<CalendarEvent>) -> Self {
        Self {
            events: Mutex::new(events),
            shares: Mutex::new(Vec::new()),
        }
    }

    /// Every stored event.
    pub fn events(&self) -> Vec<CalendarEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn shares(&self) -> Vec<(String, String)> {
        self.shares.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CalendarService for MockCalendar {
    async fn list_events(
        &self,
        _calendar_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<CalendarEvent>> {
        let events = self.events.lock().map_err(|e| Error::internal(e.to_string()))?;
        Ok(events
            .iter()
            .filter(|e| e.start < to && e.end > from)
            .cloned()
            .collect())
    }

    async fn create_event(&self, _calendar_id: &str, event: NewCalendarEvent) -> Result<CalendarEvent> {
        let mut events = self.events.lock().map_err(|e| Error::internal(e.to_string()))?;
        let created = CalendarEvent {
            id: format!("evt-{}", events.len() + 1),
            summary: event.summary,
            description: event.description,
            start: event.start,
            end: event.end,
            kind: event.kind,
            service_id: event.service_id,
        };
        events.push(created.clone());
        Ok(created)
    }

    async fn share(&self, calendar_id: &str, email: &str) -> Result<()> {
        self.shares
            .lock()
            .map_err(|e| Error::internal(e.to_string()))?
            .push((calendar_id.to_string(), email.to_string()));
        Ok(())
    }
}
