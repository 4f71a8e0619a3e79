//! # Error Handling
//!
//! Defines the closed set of failure kinds a request can end with and how
//! each one is turned into an HTTP response.
//!
//! ## Error Categories:
//! - **InvalidFormat / EmptyFile / TooLarge**: Upload rejected before any
//!   temp file or provider call (400)
//! - **BadRequest**: Malformed multipart body or missing `audio` part (400)
//! - **NotFound**: Unknown session or route (404)
//! - **Upstream**: Transcription, reply or synthesis failed (500)
//! - **Internal**: Temp file could not be written (500)
//!
//! ## JSON Response Format:
//! ```json
//! { "error": "too_large", "detail": "Audio file exceeds the 10MB limit" }
//! ```

use crate::pipeline::PipelineStage;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Every way a request can fail.
///
/// Callers match on the variant instead of inspecting messages.
#[derive(Debug)]
pub enum AppError {
    /// File extension is not in the configured allow-set
    InvalidFormat(String),

    /// Upload contained zero bytes
    EmptyFile,

    /// Upload exceeded the configured size limit (in megabytes)
    TooLarge { limit_mb: u64 },

    /// Client sent a request the multipart reader could not use
    BadRequest(String),

    /// Requested session or route does not exist
    NotFound(String),

    /// An external provider call failed during the named stage
    Upstream {
        stage: PipelineStage,
        message: String,
    },

    /// Server-side failure outside the providers (temp file I/O)
    Internal(String),
}

impl AppError {
    /// Machine-readable kind used as the `error` field of the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidFormat(_) => "invalid_format",
            AppError::EmptyFile => "empty_file",
            AppError::TooLarge { .. } => "too_large",
            AppError::BadRequest(_) => "bad_request",
            AppError::NotFound(_) => "not_found",
            AppError::Upstream { .. } => "upstream_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidFormat(allowed) => {
                write!(f, "Unsupported audio format. Allowed: {}", allowed)
            }
            AppError::EmptyFile => write!(f, "Audio file is empty"),
            AppError::TooLarge { limit_mb } => {
                write!(f, "Audio file exceeds the {}MB limit", limit_mb)
            }
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Upstream { stage, message } => {
                write!(f, "Upstream {} failed: {}", stage, message)
            }
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// ## HTTP Status Code Mapping:
/// - InvalidFormat/EmptyFile/TooLarge/BadRequest → 400
/// - NotFound → 404
/// - Upstream/Internal → 500
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidFormat(_)
            | AppError::EmptyFile
            | AppError::TooLarge { .. }
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream { .. } | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "detail": self.to_string(),
        }))
    }
}

/// Shorthand for `Result<T, AppError>`.
pub type AppResult<T> = Result<T, AppError>;
