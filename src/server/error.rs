//! Server error types with HTTP status code mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::error::IngestionError;

/// Body returned when the configured CSV file is missing.
pub const SOURCE_NOT_FOUND_MESSAGE: &str = "CSV file not found.";
/// Body returned for any other run-level failure.
pub const UPLOAD_ERROR_MESSAGE: &str = "Upload error.";

/// Errors surfaced by HTTP handlers.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Run-level ingestion failure
    #[error("{0}")]
    Ingestion(#[from] IngestionError),
}

impl ServerError {
    /// Map error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Ingestion(IngestionError::SourceNotFound { .. }) => StatusCode::BAD_REQUEST,
            ServerError::Ingestion(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the caller; internal details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            ServerError::Ingestion(IngestionError::SourceNotFound { .. }) => SOURCE_NOT_FOUND_MESSAGE,
            ServerError::Ingestion(_) => UPLOAD_ERROR_MESSAGE,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.status_code(), self.public_message()).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, ServerError>;
