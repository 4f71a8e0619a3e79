//! # HTTP Handlers
//!
//! Route table and the request handlers behind it.
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | GET | `/` | [`health::service_info`] |
//! | GET | `/health` | [`health::health_check`] |
//! | POST | `/voice-agent` | [`voice::voice_agent`] |
//! | POST | `/voice-agent-audio` | [`voice::voice_agent_audio`] |
//! | POST | `/audio-chat`, `/audio-chat/` | [`chat::audio_chat`] |
//! | DELETE | `/audio-chat/{session_id}` | [`chat::delete_session`] |
//! | GET | `/audio-chat/{session_id}/history` | [`chat::session_history`] |
//!
//! Anything else gets a 404 in the same error format as every other failure.

pub mod chat; // Session-aware conversation endpoints
pub mod upload; // Multipart upload reader
pub mod voice; // Single-turn endpoints

use crate::error::AppError;
use crate::health;
use actix_web::{web, HttpRequest, HttpResponse};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(health::service_info))
        .route("/health", web::get().to(health::health_check))
        .route("/voice-agent", web::post().to(voice::voice_agent))
        .route("/voice-agent-audio", web::post().to(voice::voice_agent_audio))
        .service(
            web::scope("/audio-chat")
                .route("", web::post().to(chat::audio_chat))
                .route("/", web::post().to(chat::audio_chat))
                .route("/{session_id}", web::delete().to(chat::delete_session))
                .route("/{session_id}/history", web::get().to(chat::session_history)),
        )
        .default_service(web::to(not_found));
}

async fn not_found(req: HttpRequest) -> Result<HttpResponse, AppError> {
    Err(AppError::NotFound(format!("{} {}", req.method(), req.path())))
}

/// Application state backed by mock providers and a private temp directory.
#[cfg(test)]
pub mod test_support {
    use crate::config::AppConfig;
    use crate::providers::mock::{MockChatModel, MockSynthesizer, MockTranscriber};
    use crate::session::InMemorySessionStore;
    use crate::state::AppState;
    use std::sync::Arc;
    use tempfile::TempDir;

    pub struct TestState {
        pub state: AppState,
        pub transcriber: Arc<MockTranscriber>,
        pub chat: Arc<MockChatModel>,
        pub synthesizer: Arc<MockSynthesizer>,
        pub sessions: Arc<InMemorySessionStore>,
        _dir: TempDir,
    }

    pub fn state(
        transcriber: MockTranscriber,
        chat: MockChatModel,
        synthesizer: MockSynthesizer,
    ) -> TestState {
        let dir = TempDir::new().expect("create temp dir");
        let mut config = AppConfig::default();
        config.provider.api_key = "sk-test".to_string();
        config.audio.temp_dir = dir.path().to_path_buf();

        let transcriber = Arc::new(transcriber);
        let chat = Arc::new(chat);
        let synthesizer = Arc::new(synthesizer);
        let sessions = Arc::new(InMemorySessionStore::new());

        let state = AppState::with_providers(
            config,
            transcriber.clone(),
            chat.clone(),
            synthesizer.clone(),
            sessions.clone(),
        );

        TestState {
            state,
            transcriber,
            chat,
            synthesizer,
            sessions,
            _dir: dir,
        }
    }
}
