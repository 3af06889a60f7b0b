//! Wiring of both orchestrators from configuration.

use std::sync::Arc;
use tokio::task::JoinHandle;

use concierge_core::config::AppConfig;
use concierge_core::{CalendarService, LlmClient, Result, TabSource};
use concierge_model_gateway::{OpenAiCompatClient, PricingTable};
use concierge_skills::{HttpCalendarService, SemanticMatcher, ToolRegistry};
use concierge_store::{build_strategy, HttpTabSource, TabLoader};

use crate::classic::ClassicOrchestrator;
use crate::classifier::Classifier;
use crate::environment::ToolEnvironment;
use crate::grading::{GradingWorker, TraceRecords};
use crate::native::NativeOrchestrator;
use crate::responder::Responder;

/// The assembled engine.
pub struct Concierge {
    pub classic: Arc<ClassicOrchestrator>,
    pub native: Arc<NativeOrchestrator>,
    pub records: Arc<TraceRecords>,
    /// Present when grading is enabled.
    pub grading_task: Option<JoinHandle<()>>,
}

/// Builder for [`Concierge`].
///
/// External services default to the HTTP adapters described by the
/// configuration; tests inject mocks instead.
pub struct ConciergeBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    tab_source: Option<Arc<dyn TabSource>>,
    calendar: Option<Arc<dyn CalendarService>>,
    registry: Option<Arc<ToolRegistry>>,
    fixed_now: Option<chrono::NaiveDateTime>,
}

impl ConciergeBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            tab_source: None,
            calendar: None,
            registry: None,
            fixed_now: None,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_tab_source(mut self, source: Arc<dyn TabSource>) -> Self {
        self.tab_source = Some(source);
        self
    }

    pub fn with_calendar(mut self, calendar: Arc<dyn CalendarService>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    /// Use a custom tool registry instead of the built-in tools.
    pub fn with_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Pin the clock tools see.
    pub fn with_fixed_now(mut self, now: chrono::NaiveDateTime) -> Self {
        self.fixed_now = Some(now);
        self
    }

    /// Build both orchestrators. Spawns the grading worker when enabled, so
    /// this must run inside a Tokio runtime.
    pub fn build(self) -> Result<Concierge> {
        let config = self.config;

        let llm: Arc<dyn LlmClient> = match self.llm {
            Some(llm) => llm,
            None => Arc::new(OpenAiCompatClient::from_config(&config.model)?),
        };
        let tab_source: Arc<dyn TabSource> = match self.tab_source {
            Some(source) => source,
            None => Arc::new(HttpTabSource::from_config(&config.tabs)?),
        };
        let calendar: Arc<dyn CalendarService> = match self.calendar {
            Some(calendar) => calendar,
            None => Arc::new(HttpCalendarService::from_config(&config.calendar)?),
        };
        let registry = self.registry.unwrap_or_else(|| Arc::new(ToolRegistry::with_builtin()));

        let pricing = Arc::new(PricingTable::from_config(&config.pricing, llm.default_model()));
        let tabs = Arc::new(TabLoader::new(tab_source));
        let strategy = build_strategy(&config.cache, tabs.clone())?;
        let matcher = Arc::new(SemanticMatcher::new(llm.clone()));

        let mut env = ToolEnvironment::new(registry.clone(), strategy, tabs, calendar, matcher)
            .with_calendar_config(config.calendar.clone());
        if let Some(now) = self.fixed_now {
            env = env.with_fixed_now(now);
        }
        let env = Arc::new(env);

        let records = Arc::new(TraceRecords::with_max_records(config.grading.max_records));
        let (grading, grading_task) = if config.grading.enabled {
            let (handle, task) = GradingWorker::new(llm.clone(), records.clone())
                .with_model(config.grading.model.clone())
                .spawn(config.grading.queue_size);
            (Some(handle), Some(task))
        } else {
            (None, None)
        };

        let classic = ClassicOrchestrator::new(env.clone(), llm.clone(), pricing.clone())
            .with_classifier(Classifier::with_config(llm.clone(), registry, &config.classifier))
            .with_responder(Responder::new(llm.clone()).with_history_turns(config.classifier.history_turns))
            .with_grading(grading.clone());
        let native = NativeOrchestrator::new(env, llm, pricing)
            .with_config(&config.native_loop)
            .with_history_turns(config.classifier.history_turns)
            .with_grading(grading);

        tracing::info!(
            strategy = ?config.cache.strategy,
            max_iterations = config.native_loop.max_iterations,
            grading = config.grading.enabled,
            "Concierge assembled"
        );

        Ok(Concierge {
            classic: Arc::new(classic),
            native: Arc::new(native),
            records,
            grading_task,
        })
    }
}
