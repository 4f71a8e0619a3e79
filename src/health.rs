//! Service identity and liveness endpoints.

use crate::state::AppState;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde_json::json;

/// `GET /` - what this service is and where its endpoints live.
pub async fn service_info(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "name": state.config.app.name,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "voice_agent": "/voice-agent",
            "voice_agent_audio": "/voice-agent-audio",
            "audio_chat": "/audio-chat",
            "delete_session": "/audio-chat/{session_id}",
            "session_history": "/audio-chat/{session_id}/history",
            "health": "/health"
        }
    }))
}

/// `GET /health` - liveness check.
///
/// ## Response:
/// ```json
/// { "status": "healthy", "timestamp": 1760400000.123 }
/// ```
/// `timestamp` is unix seconds as a float.
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": unix_timestamp()
    }))
}

fn unix_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
