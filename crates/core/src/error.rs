//! Error types for Concierge.

use thiserror::Error;

/// Result type alias using Concierge's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Concierge.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Request Errors
    // =========================================================================
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    // =========================================================================
    // External Service Errors
    // =========================================================================
    #[error("{service} error{}: {message}", status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    ExternalService {
        service: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Timeout: {0}")]
    Timeout(String),

    // =========================================================================
    // Model Output Errors
    // =========================================================================
    #[error("Malformed model output: {0}")]
    MalformedModelOutput(String),

    #[error("Classification failed: {0}")]
    ClassificationFailed(String),

    #[error("Malformed classification: {0}")]
    MalformedClassification(String),

    #[error("Iteration budget exceeded: used {used}, limit {limit}")]
    BudgetExceeded { used: usize, limit: usize },

    // =========================================================================
    // Infrastructure Errors
    // =========================================================================
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create an invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create an external service error.
    pub fn external(service: impl Into<String>, status: Option<u16>, msg: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            status,
            message: msg.into(),
        }
    }

    /// Create a resource unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ResourceUnavailable(msg.into())
    }

    /// Create a malformed model output error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedModelOutput(msg.into())
    }

    /// Create a cache error.
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ResourceUnavailable(_) => "RESOURCE_UNAVAILABLE",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::MalformedModelOutput(_) => "MALFORMED_MODEL_OUTPUT",
            Self::ClassificationFailed(_) => "CLASSIFICATION_FAILED",
            Self::MalformedClassification(_) => "MALFORMED_CLASSIFICATION",
            Self::BudgetExceeded { .. } => "BUDGET_EXCEEDED",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }
}
