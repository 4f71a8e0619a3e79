//! # Application State
//!
//! Everything request handlers share. One `AppState` is built at startup and
//! handed to every worker through `web::Data`.
//!
//! ## What is shared:
//! - **config**: Read-only after startup, so a plain `Arc` is enough
//! - **pipeline**: Stateless apart from the session store it points at
//! - **sessions**: The only mutable shared data; the store does its own locking
//!
//! ## Rust Concepts:
//! - **Arc<dyn Trait>**: Shared ownership of "some implementation", so tests
//!   can swap the OpenAI client for mocks without changing handler code
//! - **Clone**: Cloning `AppState` only bumps reference counts

use crate::config::AppConfig;
use crate::pipeline::VoicePipeline;
use crate::providers::{ChatModel, OpenAiProvider, SpeechSynthesizer, Transcriber};
use crate::session::{InMemorySessionStore, SessionStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<VoicePipeline>,
    /// Same store the pipeline uses, for the history and delete endpoints
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    /// Production wiring: one OpenAI-compatible client serves all three
    /// provider roles, sessions live in memory.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let provider = Arc::new(OpenAiProvider::from_config(&config)?);
        Ok(Self::with_providers(
            config,
            provider.clone(),
            provider.clone(),
            provider,
            Arc::new(InMemorySessionStore::new()),
        ))
    }

    /// Wire the state from explicit providers and store.
    pub fn with_providers(
        config: AppConfig,
        transcriber: Arc<dyn Transcriber>,
        chat: Arc<dyn ChatModel>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let pipeline = VoicePipeline::new(&config, transcriber, chat, synthesizer, sessions.clone());
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            sessions,
        }
    }
}
