//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<ApiResponse<T>, AppError>`. Both sides
//! render the same JSON envelope: `{"status": 200, "data": ...}` on success,
//! `{"status": N, "message": ..., "details": ...}` on failure.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Missing or unknown `X-User-ID`.
    #[error("Unauthorized")]
    Unauthorized,

    /// User lacks permission.
    #[error("{0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<String>,
    },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// A 400 with a message and no details.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    /// A 400 with a message and the underlying cause as details.
    pub fn invalid(message: impl Into<String>, details: impl ToString) -> Self {
        Self::BadRequest {
            message: message.into(),
            details: Some(details.to_string()),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Database(RepositoryError::MissingReference(_)) | Self::BadRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

/// Body of an error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    status: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let (message, details) = match self {
            Self::Database(RepositoryError::NotFound) => ("Not found".to_string(), None),
            Self::Database(RepositoryError::Conflict(detail)) => {
                ("Conflicts with an existing record".to_string(), Some(detail))
            }
            Self::Database(RepositoryError::MissingReference(detail)) => {
                ("Referenced record does not exist".to_string(), Some(detail))
            }
            Self::Database(_) | Self::Internal(_) => ("Internal server error".to_string(), None),
            Self::BadRequest { message, details } => (message, details),
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            status: status.as_u16(),
            message,
            details,
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid("Invalid request body", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::invalid("Invalid path parameter", rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Successful response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    status: u16,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wrap `data` in a 200 envelope.
    pub const fn ok(data: T) -> Self {
        Self { status: 200, data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Set the Sentry user context from the `X-User-ID` user.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("Basket not found".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(get_status(AppError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            get_status(AppError::Forbidden("no".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::bad_request("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::Conflict("users_email_key".into()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let (status, body) = render(AppError::invalid(
            "Invalid basket data",
            "price must be positive",
        ))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert_eq!(body["message"], "Invalid basket data");
        assert_eq!(body["details"], "price must be positive");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (status, body) = render(AppError::Database(RepositoryError::DataCorruption(
            "invalid role 'owner' for user 7".into(),
        )))
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_success_envelope() {
        let response = ApiResponse::ok(serde_json::json!({"message": "pong"})).into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], 200);
        assert_eq!(body["data"]["message"], "pong");
    }
}
