//! Axum-based HTTP server for the gateway.

use axum::{
    extract::{rejection::JsonRejection, MatchedPath, Path, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use concierge_controller::TraceRecords;
use concierge_core::config::ServerConfig;
use concierge_core::{ConversationRequest, ConversationResponse, Error, Orchestrator, Result};
use concierge_governance::track_request;

use crate::error::ApiError;

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Origins allowed by CORS. Empty or `*` allows any.
    pub allowed_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for GatewayConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            allowed_origins: config.allowed_origins.clone(),
        }
    }
}

/// Shared application state.
pub struct AppState {
    pub classic: Arc<dyn Orchestrator>,
    pub native: Arc<dyn Orchestrator>,
    /// Grading results, written by the background worker.
    pub records: Arc<TraceRecords>,
}

/// Gateway server.
pub struct GatewayServer {
    config: GatewayConfig,
    state: Arc<AppState>,
    metrics_handle: Option<PrometheusHandle>,
}

impl GatewayServer {
    /// Create a new gateway server.
    pub fn new(config: GatewayConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
            metrics_handle: None,
        }
    }

    /// Serve `/metrics` from this Prometheus handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    fn cors(&self) -> CorsLayer {
        let any = self.config.allowed_origins.is_empty() || self.config.allowed_origins.iter().any(|o| o == "*");
        let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
        if any {
            return layer.allow_origin(Any);
        }
        let origins: Vec<HeaderValue> = self
            .config
            .allowed_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        layer.allow_origin(origins)
    }

    /// Build the Axum router.
    pub fn build_router(&self) -> Router {
        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/v1/chat", post(classic_handler))
            .route("/v1/chat/native", post(native_handler))
            .route("/v1/traces/:trace_id", get(trace_handler))
            .with_state(self.state.clone());

        if let Some(handle) = &self.metrics_handle {
            let handle = handle.clone();
            router = router.route("/metrics", get(move || async move { handle.render() }));
        }

        router
            .layer(middleware::from_fn(track_metrics))
            .layer(self.cors())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server.
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Configuration(format!("Failed to bind {}: {}", addr, e)))?;

        tracing::info!(addr = %addr, "Gateway server starting");

        axum::serve(listener, self.build_router())
            .await
            .map_err(|e| Error::internal(format!("Server error: {}", e)))?;

        Ok(())
    }
}

// =============================================================================
// Middleware
// =============================================================================

async fn track_metrics(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    // Route templates keep label cardinality bounded.
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    track_request(&method, &path, response.status().as_u16(), started.elapsed().as_secs_f64());
    response
}

// =============================================================================
// Handlers
// =============================================================================

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_chat(
    orchestrator: &dyn Orchestrator,
    payload: std::result::Result<Json<ConversationRequest>, JsonRejection>,
) -> std::result::Result<Json<ConversationResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| Error::invalid_request(e.body_text()))?;
    tracing::info!(
        architecture = orchestrator.architecture().as_str(),
        store_id = %request.store_id,
        messages = request.messages.len(),
        "Processing chat request"
    );
    let response = orchestrator.handle(request).await?;
    Ok(Json(response))
}

/// Classic pipeline.
async fn classic_handler(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ConversationRequest>, JsonRejection>,
) -> std::result::Result<Json<ConversationResponse>, ApiError> {
    handle_chat(state.classic.as_ref(), payload).await
}

/// Native tool-calling loop.
async fn native_handler(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ConversationRequest>, JsonRejection>,
) -> std::result::Result<Json<ConversationResponse>, ApiError> {
    handle_chat(state.native.as_ref(), payload).await
}

/// Grading record for a trace, once the worker has written it.
async fn trace_handler(State(state): State<Arc<AppState>>, Path(trace_id): Path<String>) -> Response {
    match state.records.get(&trace_id) {
        Some(record) => (StatusCode::OK, Json(record)).into_response(),
        None => ApiError::new(Error::unavailable(format!("no grading record for trace {}", trace_id))).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_config_from_server_section() {
        let config = GatewayConfig::from(&ServerConfig {
            host: "127.0.0.1".into(),
            port: 9000,
            allowed_origins: vec!["https://shop.example".into()],
            enable_metrics: false,
        });
        assert_eq!(config.port, 9000);
        assert_eq!(config.allowed_origins, vec!["https://shop.example"]);
    }
}
