//! # Voice Pipeline
//!
//! Drives one request through every stage, in order:
//!
//! ```text
//! Validating → Storing → Transcribing → (Contextualizing) → Replying → Synthesizing → Responding
//! ```
//!
//! Contextualizing only happens for a session that already has turns. There
//! are no retries; the first failure ends the run.
//!
//! ## Failure rules:
//! - Validation errors are returned before the temp file or session exist
//! - The temp file is a guard, so it is removed whichever way the run ends
//! - A session only changes after synthesis succeeded

pub mod reply; // System prompt, context rendering and the blank-reply fallback

use crate::audio::{AudioValidator, TempFileManager, UploadedAudio};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::providers::{ChatModel, SpeechSynthesizer, Transcriber, UpstreamError};
use crate::session::{SessionStore, Turn};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

pub use reply::ReplyGenerator;

/// Where a run currently is. Upstream errors carry the stage that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Validating,
    Storing,
    Transcribing,
    Contextualizing,
    Replying,
    Synthesizing,
    Responding,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Validating => "validation",
            PipelineStage::Storing => "storage",
            PipelineStage::Transcribing => "transcription",
            PipelineStage::Contextualizing => "context",
            PipelineStage::Replying => "reply",
            PipelineStage::Synthesizing => "synthesis",
            PipelineStage::Responding => "response",
        };
        f.write_str(name)
    }
}

/// Result of a stateless run.
#[derive(Debug, Clone)]
pub struct VoiceReply {
    pub transcription: String,
    pub response_text: String,
    pub audio: Vec<u8>,
    /// Seconds, rounded to two decimals
    pub processing_time: f64,
}

/// Result of a session-aware run.
#[derive(Debug, Clone)]
pub struct ConversationReply {
    pub session_id: String,
    pub transcription: String,
    pub response_text: String,
    pub audio: Vec<u8>,
    /// Full session history including this exchange
    pub history: Vec<Turn>,
    pub processing_time: f64,
}

pub struct VoicePipeline {
    validator: AudioValidator,
    temp_files: TempFileManager,
    transcriber: Arc<dyn Transcriber>,
    replies: ReplyGenerator,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sessions: Arc<dyn SessionStore>,
    language: String,
}

impl VoicePipeline {
    pub fn new(
        config: &AppConfig,
        transcriber: Arc<dyn Transcriber>,
        chat: Arc<dyn ChatModel>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            validator: AudioValidator::from_config(config),
            temp_files: TempFileManager::new(config.audio.temp_dir.clone()),
            transcriber,
            replies: ReplyGenerator::from_config(chat, config),
            synthesizer,
            sessions,
            language: config.conversation.language.clone(),
        }
    }

    pub fn validator(&self) -> &AudioValidator {
        &self.validator
    }

    /// Transcribe, reply and speak without any session.
    pub async fn single_turn(&self, upload: UploadedAudio) -> AppResult<VoiceReply> {
        let started = Instant::now();

        enter(PipelineStage::Validating);
        self.validator.validate(&upload)?;

        let transcription = self.transcribe(&upload).await?;

        enter(PipelineStage::Replying);
        let response_text = self
            .replies
            .reply(&transcription)
            .await
            .map_err(|e| upstream(PipelineStage::Replying, e))?;

        let audio = self.synthesize(&response_text).await?;

        enter(PipelineStage::Responding);
        Ok(VoiceReply {
            transcription,
            response_text,
            audio,
            processing_time: elapsed_secs(started),
        })
    }

    /// Same as [`single_turn`](Self::single_turn), with the session's recent
    /// turns as context. The session stays locked for the whole run and the
    /// exchange is only recorded once synthesis succeeded.
    pub async fn conversation_turn(
        &self,
        upload: UploadedAudio,
        session_id: Option<&str>,
    ) -> AppResult<ConversationReply> {
        let started = Instant::now();

        enter(PipelineStage::Validating);
        self.validator.validate(&upload)?;

        let mut lease = self.sessions.get_or_create(session_id).await;
        tracing::debug!(
            session_id = %lease.id(),
            new = lease.is_new(),
            turns = lease.history().len(),
            "Session leased"
        );

        let transcription = self.transcribe(&upload).await?;

        if !lease.history().is_empty() {
            enter(PipelineStage::Contextualizing);
        }
        let prompt = self.replies.prompt_for(&transcription, lease.history());

        enter(PipelineStage::Replying);
        let response_text = self
            .replies
            .reply(&prompt)
            .await
            .map_err(|e| upstream(PipelineStage::Replying, e))?;

        let audio = self.synthesize(&response_text).await?;

        enter(PipelineStage::Responding);
        lease.record_exchange(transcription.clone(), response_text.clone());

        Ok(ConversationReply {
            session_id: lease.id().to_string(),
            transcription,
            response_text,
            audio,
            history: lease.history().to_vec(),
            processing_time: elapsed_secs(started),
        })
    }

    /// Storing and Transcribing. The temp file is gone when this returns.
    async fn transcribe(&self, upload: &UploadedAudio) -> AppResult<String> {
        enter(PipelineStage::Storing);
        let mut temp = self.temp_files.store(upload).await?;

        enter(PipelineStage::Transcribing);
        let result = self.transcriber.transcribe(temp.path(), &self.language).await;
        temp.release();

        let transcription = result.map_err(|e| upstream(PipelineStage::Transcribing, e))?;
        tracing::info!(chars = transcription.chars().count(), "Audio transcribed");
        Ok(transcription)
    }

    async fn synthesize(&self, text: &str) -> AppResult<Vec<u8>> {
        enter(PipelineStage::Synthesizing);
        self.synthesizer
            .synthesize(text)
            .await
            .map_err(|e| upstream(PipelineStage::Synthesizing, e))
    }
}

fn enter(stage: PipelineStage) {
    tracing::debug!(stage = %stage, "Pipeline stage");
}

fn upstream(stage: PipelineStage, err: UpstreamError) -> AppError {
    tracing::error!(stage = %stage, error = %err, "Upstream call failed");
    AppError::Upstream {
        stage,
        message: err.message().to_string(),
    }
}

fn elapsed_secs(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 100.0).round() / 100.0
}
