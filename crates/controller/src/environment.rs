//! What both orchestrators share: store data loading and tool dispatch.

use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

use concierge_core::config::CalendarConfig;
use concierge_core::{CalendarService, ConversationRequest, FunctionResult, Stage, ToolName};
use concierge_skills::{SemanticMatcher, ToolContext, ToolRegistry};
use concierge_store::{CachingStrategy, TabLoader};

use crate::recorder::TraceRecorder;

/// Tools plus the services they run against.
pub struct ToolEnvironment {
    registry: Arc<ToolRegistry>,
    strategy: Arc<dyn CachingStrategy>,
    tabs: Arc<TabLoader>,
    calendar: Arc<dyn CalendarService>,
    matcher: Arc<SemanticMatcher>,
    calendar_config: CalendarConfig,
    now: Option<chrono::NaiveDateTime>,
}

impl ToolEnvironment {
    pub fn new(
        registry: Arc<ToolRegistry>,
        strategy: Arc<dyn CachingStrategy>,
        tabs: Arc<TabLoader>,
        calendar: Arc<dyn CalendarService>,
        matcher: Arc<SemanticMatcher>,
    ) -> Self {
        Self {
            registry,
            strategy,
            tabs,
            calendar,
            matcher,
            calendar_config: CalendarConfig::default(),
            now: None,
        }
    }

    pub fn with_calendar_config(mut self, config: CalendarConfig) -> Self {
        self.calendar_config = config;
        self
    }

    /// Pin the clock tools see. Used by tests that book fixed dates.
    pub fn with_fixed_now(mut self, now: chrono::NaiveDateTime) -> Self {
        self.now = Some(now);
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Load the store snapshot and build the per-request tool context.
    pub async fn prepare(&self, request: &ConversationRequest, recorder: &mut TraceRecorder) -> ToolContext {
        let started = Instant::now();
        let outcome = self.strategy.load(&request.store_id, request.cached_data.clone()).await;
        recorder.record_stage(Stage::DataLoad, started.elapsed());
        recorder.step(
            Stage::DataLoad,
            format!(
                "{} strategy: {} cached, {} fetched",
                self.strategy.name(),
                outcome.hits.len(),
                outcome.fetched.len()
            ),
        );

        let mut ctx = ToolContext::new(
            request.store_id.clone(),
            self.tabs.clone(),
            self.calendar.clone(),
            self.matcher.clone(),
        )
        .with_store_data(outcome.data)
        .with_calendar_id(self.calendar_config.calendar_for(&request.store_id))
        .with_default_capacity(self.calendar_config.default_capacity);
        if let Some(now) = self.now {
            ctx = ctx.with_now(now);
        }
        ctx
    }

    /// Run one tool and record it (call trace, stage timing and any model
    /// usage inside the tool).
    pub async fn dispatch(
        &self,
        tool: &ToolName,
        args: &Value,
        ctx: &ToolContext,
        recorder: &mut TraceRecorder,
    ) -> FunctionResult {
        let (result, call) = self.registry.dispatch(tool, args, ctx).await;
        recorder.record_stage(Stage::ToolExecution, Duration::from_millis(call.duration_ms));
        recorder.record_tool_usage(ctx.usage.drain());
        recorder.step(
            Stage::ToolExecution,
            match &result.error {
                Some(error) => format!("{} failed: {}", tool, error),
                None => format!("{} succeeded", tool),
            },
        );
        recorder.record_tool(call);
        result
    }
}
