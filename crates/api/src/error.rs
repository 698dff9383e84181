//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, RepositoryError};
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),
    /// Domain logic error.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
        };

        metrics::counter!("api_errors_total", "status" => status.as_u16().to_string())
            .increment(1);
        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match &err {
        DomainError::Order(_) | DomainError::Lifecycle(_) => StatusCode::BAD_REQUEST,
        DomainError::Repository(repo_err) => match repo_err {
            RepositoryError::NotFound(_) => StatusCode::NOT_FOUND,
            RepositoryError::AlreadyExists(_) => StatusCode::CONFLICT,
            RepositoryError::IdMismatch { .. } => StatusCode::BAD_REQUEST,
            RepositoryError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            RepositoryError::Canceled => StatusCode::SERVICE_UNAVAILABLE,
            RepositoryError::Decode { .. }
            | RepositoryError::Encode(_)
            | RepositoryError::Store(_)
            | RepositoryError::Scan(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
    };

    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }

    (status, err.to_string())
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        ApiError::Domain(err.into())
    }
}
