//! Unified error handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use grove_engine::ErrorKind;
use serde::Serialize;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] grove_engine::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("Writes suspended until the journal is reachable")]
    WritesSuspended,

    #[error("Journal task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Engine(e) => match e.kind() {
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::InvalidState => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::StoreFailure => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::WritesSuspended => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_message, details) = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ("Database error".to_string(), None)
            }
            AppError::Engine(e) if e.kind() == ErrorKind::StoreFailure => {
                tracing::error!("Store failure: {:?}", e);
                ("Internal server error".to_string(), Some(e.to_string()))
            }
            AppError::Engine(e) => {
                tracing::warn!("Engine error: {:?}", e);
                (e.to_string(), None)
            }
            AppError::Unauthorized(reason) => ("Unauthorized".to_string(), Some(reason.to_string())),
            AppError::WritesSuspended => (self.to_string(), None),
            AppError::Task(e) => {
                tracing::error!("Journal task failed: {:?}", e);
                ("Internal server error".to_string(), None)
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn engine_kinds_map_to_statuses() {
        let id = Uuid::new_v4();
        let cases = [
            (
                grove_engine::Error::Forbidden {
                    project: id,
                    user: "mallory".into(),
                },
                StatusCode::FORBIDDEN,
            ),
            (grove_engine::Error::VersionCommitted(id), StatusCode::BAD_REQUEST),
            (grove_engine::Error::ContainerNotEmpty(id), StatusCode::BAD_REQUEST),
            (grove_engine::Error::SnippetNotFound(id), StatusCode::NOT_FOUND),
            (
                grove_engine::Error::Store("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(AppError::from(error).status(), status);
        }
    }

    #[test]
    fn suspended_writes_are_503() {
        let response = AppError::WritesSuspended.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn unauthorized_is_401() {
        let response = AppError::Unauthorized("Missing authorization header").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
