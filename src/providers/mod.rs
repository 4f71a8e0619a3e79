//! # Upstream Providers
//!
//! The three external calls the pipeline delegates to. Each one is a trait
//! so the orchestrator can be driven by the real HTTP client or by test
//! doubles.
//!
//! ## Error boundary:
//! Every implementation reports failure as [`UpstreamError`]. Network errors,
//! non-2xx statuses, malformed bodies and timeouts all collapse into it, and
//! no provider-specific type travels past this module.

pub mod openai; // OpenAI-compatible HTTP client

#[cfg(test)]
pub mod mock; // Scripted providers for tests

use async_trait::async_trait;
use std::fmt;
use std::path::Path;

pub use openai::OpenAiProvider;

/// Speech-to-text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio file at `audio`, hinting the spoken language.
    async fn transcribe(&self, audio: &Path, language: &str) -> Result<String, UpstreamError>;
}

/// Chat completion with one system instruction and one user message.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, UpstreamError>;
}

/// Text-to-speech. Returns encoded audio bytes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, UpstreamError>;
}

/// Any failure reported by an upstream provider, carrying its message.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamError {
    message: String,
}

impl UpstreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for UpstreamError {}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::new(format!("request timed out: {}", err))
        } else {
            UpstreamError::new(format!("request failed: {}", err))
        }
    }
}
