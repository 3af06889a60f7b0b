//! Engine errors as HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use concierge_core::Error;

/// Error body: `{code, message, trace_id}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub trace_id: String,
}

/// An engine error bound to the request it failed.
#[derive(Debug)]
pub struct ApiError {
    pub error: Error,
    pub trace_id: String,
}

impl ApiError {
    pub fn new(error: Error) -> Self {
        Self {
            error,
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        status_for(&self.error)
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self::new(error)
    }
}

/// HTTP status for an engine error.
pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::Validation(_) | Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        Error::ResourceUnavailable(_) => StatusCode::NOT_FOUND,
        Error::BudgetExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Error::ExternalService { .. } | Error::MalformedModelOutput(_) | Error::MalformedClassification(_) => {
            StatusCode::BAD_GATEWAY
        }
        Error::Timeout(_) | Error::ClassificationFailed(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(trace_id = %self.trace_id, code = self.error.code(), error = %self.error, "Request failed");
        } else {
            tracing::info!(trace_id = %self.trace_id, code = self.error.code(), error = %self.error, "Request rejected");
        }
        let body = ErrorResponse {
            code: self.error.code().to_string(),
            message: self.error.to_string(),
            trace_id: self.trace_id,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&Error::Validation(vec!["x".into()])), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&Error::invalid_request("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&Error::unavailable("tab")), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&Error::BudgetExceeded { used: 5, limit: 5 }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_for(&Error::external("completion", Some(500), "x")), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(&Error::malformed("x")), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(&Error::Timeout("x".into())), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_for(&Error::ClassificationFailed("x".into())), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_for(&Error::cache("x")), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
