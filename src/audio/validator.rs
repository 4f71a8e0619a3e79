//! # Upload Validation
//!
//! Cheap checks that run before any temp file is written or any provider
//! is called. Validation never mutates anything.
//!
//! ## Check order:
//! 1. **Extension**: case-insensitive member of the allow-set → `InvalidFormat`
//! 2. **Empty**: zero bytes → `EmptyFile`
//! 3. **Size**: more than the configured limit → `TooLarge`

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use actix_web::web::Bytes;
use std::path::Path;

/// An audio upload held for the duration of one request.
#[derive(Debug, Clone)]
pub struct UploadedAudio {
    filename: String,
    content_type: Option<String>,
    bytes: Bytes,
}

impl UploadedAudio {
    pub fn new(filename: impl Into<String>, content_type: Option<String>, bytes: Bytes) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            bytes,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lowercased extension of the declared filename, without the dot.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.filename)
    }
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Validates uploads against the configured allow-set and size limit.
#[derive(Debug, Clone)]
pub struct AudioValidator {
    allowed_extensions: Vec<String>,
    max_bytes: u64,
    max_mb: u64,
}

impl AudioValidator {
    pub fn new(allowed_extensions: Vec<String>, max_mb: u64) -> Self {
        Self {
            allowed_extensions,
            max_bytes: max_mb * 1024 * 1024,
            max_mb,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.allowed_extensions(), config.audio.max_audio_size_mb)
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Run all checks against a fully received upload.
    pub fn validate(&self, upload: &UploadedAudio) -> AppResult<()> {
        self.check_extension(upload.filename())?;
        self.check_length(upload.len() as u64)?;

        tracing::info!(
            filename = %upload.filename(),
            content_type = upload.content_type().unwrap_or("unknown"),
            bytes = upload.len(),
            "Audio upload validated"
        );
        Ok(())
    }

    /// Extension check on its own, usable before any bytes are read.
    pub fn check_extension(&self, filename: &str) -> AppResult<()> {
        match extension_of(filename) {
            Some(ext) if self.allowed_extensions.contains(&ext) => Ok(()),
            _ => Err(AppError::InvalidFormat(self.allowed_list())),
        }
    }

    /// Length check against a known byte count.
    pub fn check_length(&self, len: u64) -> AppResult<()> {
        if len == 0 {
            return Err(AppError::EmptyFile);
        }
        self.check_limit(len)
    }

    /// Upper bound only; used while a part is still streaming in.
    pub fn check_limit(&self, len: u64) -> AppResult<()> {
        if len > self.max_bytes {
            return Err(AppError::TooLarge { limit_mb: self.max_mb });
        }
        Ok(())
    }

    fn allowed_list(&self) -> String {
        self.allowed_extensions
            .iter()
            .map(|ext| format!(".{}", ext))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
