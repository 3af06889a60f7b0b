//! Per-request execution context handed to every business tool.

use chrono::NaiveDateTime;
use std::sync::{Arc, Mutex};

use concierge_core::{CalendarService, DataType, LlmUsage, Row, StoreData};
use concierge_store::TabLoader;

use crate::matcher::SemanticMatcher;
use crate::records::{HoursRecord, ProductRecord, ServiceRecord};

/// Model usage incurred inside a tool (semantic scoring).
#[derive(Debug, Clone, PartialEq)]
pub struct ModelUsage {
    pub model: String,
    pub usage: LlmUsage,
}

/// Collects model usage from tool internals so the orchestrator can cost it.
#[derive(Debug, Default)]
pub struct UsageMeter {
    entries: Mutex<Vec<ModelUsage>>,
}

impl UsageMeter {
    pub fn record(&self, model: &str, usage: LlmUsage) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(ModelUsage {
                model: model.to_string(),
                usage,
            });
        }
    }

    pub fn snapshot(&self) -> Vec<ModelUsage> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Take every recorded entry, leaving the meter empty.
    pub fn drain(&self) -> Vec<ModelUsage> {
        self.entries
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().map(|e| e.is_empty()).unwrap_or(true)
    }
}

/// Everything a tool may read or call while handling one request.
pub struct ToolContext {
    pub store_id: String,
    /// Pre-warmed snapshot; tabs missing here are fetched on demand.
    pub store_data: StoreData,
    pub tabs: Arc<TabLoader>,
    pub calendar: Arc<dyn CalendarService>,
    pub calendar_id: String,
    pub matcher: Arc<SemanticMatcher>,
    /// Capacity for services whose row does not state one.
    pub default_capacity: u32,
    /// Store-local "now", used for timestamps and default date ranges.
    pub now: NaiveDateTime,
    pub usage: UsageMeter,
}

impl ToolContext {
    pub fn new(
        store_id: impl Into<String>,
        tabs: Arc<TabLoader>,
        calendar: Arc<dyn CalendarService>,
        matcher: Arc<SemanticMatcher>,
    ) -> Self {
        let store_id = store_id.into();
        Self {
            calendar_id: store_id.clone(),
            store_id,
            store_data: StoreData::default(),
            tabs,
            calendar,
            matcher,
            default_capacity: 1,
            now: chrono::Local::now().naive_local(),
            usage: UsageMeter::default(),
        }
    }

    pub fn with_store_data(mut self, data: StoreData) -> Self {
        self.store_data = data;
        self
    }

    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = calendar_id.into();
        self
    }

    pub fn with_default_capacity(mut self, capacity: u32) -> Self {
        self.default_capacity = capacity;
        self
    }

    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    /// Rows of a tab: the pre-warmed snapshot first, then a direct fetch.
    /// `None` when the tab does not exist or cannot be loaded.
    pub async fn rows(&self, data_type: DataType) -> Option<Vec<Row>> {
        if let Some(rows) = self.store_data.get(data_type) {
            return Some(rows.clone());
        }
        match self.tabs.fetch(&self.store_id, data_type).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(
                    store_id = %self.store_id,
                    tab = %data_type,
                    error = %e,
                    "Tab fetch failed during tool execution"
                );
                None
            }
        }
    }

    pub async fn services(&self) -> Option<Vec<ServiceRecord>> {
        self.rows(DataType::Services)
            .await
            .map(|rows| ServiceRecord::parse_all(&rows, self.default_capacity))
    }

    pub async fn products(&self) -> Option<Vec<ProductRecord>> {
        self.rows(DataType::Products).await.map(|rows| ProductRecord::parse_all(&rows))
    }

    pub async fn hours(&self) -> Option<Vec<HoursRecord>> {
        self.rows(DataType::Hours).await.map(|rows| HoursRecord::parse_all(&rows))
    }
}
