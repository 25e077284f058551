use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use crate::web::utils::response::ErrorResponse;

/// Everything that can end an upload request early. Always rendered as `{"error": ...}`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    #[error("No file part")]
    NoFilePart,
    #[error("No selected file")]
    NoSelectedFile,
    #[error("File type not supported")]
    FileTypeNotSupported,
    #[error("Not enough disk space (min {0}MB required)")]
    LowDiskSpace(u64),
    #[error("Failed to extract frames: {0}")]
    FrameExtraction(String),
    #[error("Failed to process image: {0}")]
    ImageProcessing(String),
    #[error("Detection failed: {0}")]
    Detection(String),
    #[error("Server crashed during processing")]
    Internal,
}

impl ResponseError for UploadError {
    fn status_code(&self) -> StatusCode {
        match self {
            UploadError::NoFilePart
            | UploadError::NoSelectedFile
            | UploadError::FileTypeNotSupported => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.to_string()))
    }
}
