use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::admin::{AdminError, SyncError};
use crate::store::StoreError;

const LOG_TARGET: &str = "server::error";

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unavailable(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ApiError::not_found(err.to_string()),
            StoreError::Overflow(_) => ApiError::bad_request(err.to_string()),
            StoreError::Database(_) => ApiError::internal(err.to_string()),
        }
    }
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::InvalidName | AdminError::InvalidDelta(_) => {
                ApiError::bad_request(err.to_string())
            }
            AdminError::Store(inner) => inner.into(),
            AdminError::Sync(SyncError::Store(inner)) => inner.into(),
            AdminError::Sync(inner) => ApiError::Unavailable(inner.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Internal(message) => {
                error!(target = LOG_TARGET, %message, "internal server error");
                message
            }
            ApiError::NotFound(message)
            | ApiError::BadRequest(message)
            | ApiError::Unavailable(message) => message,
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
