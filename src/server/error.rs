//! Error type returned by the HTTP handlers.
//!
//! Every failure becomes a JSON body `{"error": "..."}` with a 400 or 500
//! status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::extractors::ExtractError;

pub const MISSING_URL: &str = "Please provide a URL";
pub const NO_VIDEO_INFO: &str = "Could not retrieve video information. Please check the URL.";
pub const FILE_MISSING: &str = "File could not be downloaded. Please try again.";

#[derive(Debug, Error)]
pub enum AppError {
    /// The request itself cannot be served
    #[error("{0}")]
    Validation(String),

    /// The extractor reported a download failure
    #[error("Download error: {0}")]
    Download(String),

    /// The extractor succeeded but left no file behind
    #[error("{}", FILE_MISSING)]
    FileMissing,

    #[error("An error occurred: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Download(_) => StatusCode::BAD_REQUEST,
            AppError::FileMissing | AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "Request failed");
        } else {
            tracing::warn!(%status, error = %message, "Request rejected");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ExtractError> for AppError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::Download(message) => AppError::Download(message),
            other => AppError::Unexpected(other.to_string()),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Unexpected(e.to_string())
    }
}
