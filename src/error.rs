use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use polars::error::PolarsError;
use serde_json::json;
use thiserror::Error;

pub const UPLOAD_PROMPT: &str = "Please upload an Excel file to begin.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Please upload an Excel file to begin.")]
    MissingUpload,
    #[error("Session not found: {0}. Please upload an Excel file to begin.")]
    SessionNotFound(String),
    #[error("Column not found: {0}")]
    InvalidColumn(String),
    #[error("File processing error: {0}")]
    FileProcessingError(String),
    #[error("File is too large: {size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },
    #[error("Upload is too large: {0}")]
    UploadTooLarge(String),
    #[error("DataFrame error: {0}")]
    DataFrameError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<PolarsError> for AppError {
    fn from(err: PolarsError) -> Self {
        AppError::DataFrameError(err.to_string())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        // The body limit surfaces mid-stream as a multipart error.
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::UploadTooLarge(err.body_text())
        } else {
            AppError::InvalidInput(format!("Malformed upload: {}", err.body_text()))
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::MissingUpload => StatusCode::BAD_REQUEST,
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidColumn(_) => StatusCode::NOT_FOUND,
            AppError::FileProcessingError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UploadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::DataFrameError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::MissingUpload.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::SessionNotFound("abc".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::FileProcessingError("bad".to_string()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::PayloadTooLarge { size: 2, limit: 1 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::UploadTooLarge("length limit exceeded".to_string()).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_missing_upload_message_is_the_prompt() {
        assert_eq!(AppError::MissingUpload.to_string(), UPLOAD_PROMPT);
        assert!(AppError::SessionNotFound("abc".to_string())
            .to_string()
            .ends_with(UPLOAD_PROMPT));
    }
}
