use config::{Config, ConfigError, Environment, File};
use secrecy::Secret;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub classifier: ClassifierConfig,
    pub native_loop: NativeLoopConfig,
    pub cache: CacheConfig,
    pub tabs: TabsConfig,
    pub calendar: CalendarConfig,
    pub pricing: PricingConfig,
    pub grading: GradingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub enable_metrics: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            allowed_origins: vec!["*".into()],
            enable_metrics: true,
        }
    }
}

/// Hosted completion service.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub api_key: Option<Secret<String>>,
    pub default_model: String,
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            default_model: "gpt-4o-mini".into(),
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClassifierConfig {
    pub timeout_secs: u64,
    pub history_turns: usize,
    /// Embed a compact catalogue summary in the classifier prompt.
    pub include_store_data: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            history_turns: 6,
            include_store_data: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NativeLoopConfig {
    pub max_iterations: usize,
}

impl Default for NativeLoopConfig {
    fn default() -> Self {
        Self { max_iterations: 5 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrategyKind {
    /// Shared store that survives across requests.
    #[default]
    Database,
    /// Fresh in-process store for every invocation.
    Memory,
    /// Data arrives with the request; no cache lookups.
    CallerSupplied,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    #[default]
    Sqlite,
    Redis,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub strategy: CacheStrategyKind,
    pub backend: CacheBackendKind,
    pub sqlite_path: String,
    pub redis_url: Option<String>,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            strategy: CacheStrategyKind::Database,
            backend: CacheBackendKind::Sqlite,
            sqlite_path: "data/cache.db".into(),
            redis_url: None,
            ttl_secs: 3600,
        }
    }
}

/// Remote tab service.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TabsConfig {
    pub base_url: String,
    pub api_key: Option<Secret<String>>,
    pub request_timeout_secs: u64,
}

impl Default for TabsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".into(),
            api_key: None,
            request_timeout_secs: 15,
        }
    }
}

/// Calendar booking service.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CalendarConfig {
    pub base_url: String,
    pub api_key: Option<Secret<String>>,
    pub request_timeout_secs: u64,
    /// Capacity for services whose row has none.
    pub default_capacity: u32,
    /// Store id to calendar id. Unlisted stores use their own id.
    pub calendars: HashMap<String, String>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8082".into(),
            api_key: None,
            request_timeout_secs: 15,
            default_capacity: 1,
            calendars: HashMap::new(),
        }
    }
}

impl CalendarConfig {
    pub fn calendar_for(&self, store_id: &str) -> String {
        self.calendars
            .get(store_id)
            .cloned()
            .unwrap_or_else(|| store_id.to_string())
    }
}

/// Price per million tokens.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ModelPriceConfig {
    pub input_per_m: f64,
    pub output_per_m: f64,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PricingConfig {
    /// Fallback model for unknown ids; the completion default when unset.
    pub default_model: Option<String>,
    pub overrides: HashMap<String, ModelPriceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GradingConfig {
    pub enabled: bool,
    pub model: Option<String>,
    pub queue_size: usize,
    /// Grading records kept for `/v1/traces`; the oldest go first.
    pub max_records: usize,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: None,
            queue_size: 64,
            max_records: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// One JSON object per line instead of human-readable output.
    pub json: bool,
    /// `EnvFilter` directives, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            filter: "info,concierge_controller=debug".into(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("CONCIERGE_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // CONCIERGE__CACHE__TTL_SECS=60 maps to cache.ttl_secs
            .add_source(Environment::with_prefix("CONCIERGE").prefix_separator("__").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
