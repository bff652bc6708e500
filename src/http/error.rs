use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::error::StoreError;

/// Request-level errors, mapped onto HTTP status codes and a JSON envelope
/// `{"status":"error","code":...,"message":...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "bad_params",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Auth(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Invalid(msg) => ApiError::Validation(msg),
            StoreError::UnknownOrg(org_id) => {
                ApiError::NotFound(format!("organization not found: {org_id}"))
            }
            StoreError::DuplicateEmail => ApiError::Conflict("email already registered".into()),
            StoreError::BadCredentials => ApiError::Auth("invalid credentials".into()),
            StoreError::Other(source) => ApiError::Internal(source),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Persistence failures are fatal to the request, never to the
        // process; details go to the log, not the client.
        let message = match &self {
            ApiError::Internal(source) => {
                tracing::error!(error = ?source, "request failed");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(json!({
            "status": "error",
            "code": self.code(),
            "message": message,
        }));
        (self.status(), body).into_response()
    }
}
