//! Error types for the persistence layer and the HTTP handlers.
//!
//! Authorization failures have no variant here: the guard answers them with a
//! redirect, never with an error status.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Repository errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("username already taken: {0}")]
    UsernameTaken(String),
}

/// Handler errors, rendered as JSON responses.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Repository(#[from] RepoError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid form: {0}")]
    Validation(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Repository(RepoError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Repository(RepoError::UsernameTaken(_)) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, details) = match &self {
            AppError::Repository(RepoError::Database(e)) => {
                tracing::error!("Database error: {:?}", e);
                ("Internal server error", None)
            }
            AppError::Repository(RepoError::UsernameTaken(name)) => {
                ("Username already taken", Some(name.clone()))
            }
            AppError::NotFound(what) => ("Not found", Some(what.clone())),
            AppError::Validation(msg) => ("Invalid form", Some(msg.clone())),
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            details,
        });

        (status, body).into_response()
    }
}
