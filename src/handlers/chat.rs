//! Conversational endpoints under `/audio-chat`.

use crate::error::AppError;
use crate::handlers::upload::read_audio_form;
use crate::session::Turn;
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Serialize)]
pub struct AudioChatResponse {
    pub session_id: String,
    pub transcription: String,
    pub response_text: String,
    pub audio_base64: String,
    pub conversation_history: Vec<Turn>,
    pub processing_time: f64,
}

#[derive(Debug, Serialize)]
pub struct SessionHistoryResponse {
    pub session_id: String,
    pub history: Vec<Turn>,
    pub message_count: usize,
}

/// One turn of a conversation.
///
/// ## Endpoint: `POST /audio-chat`
///
/// ## Request:
/// Multipart form data with an "audio" file and an optional "session_id".
/// A missing or unknown session id starts a new session; the id to use for
/// the next turn is returned in the response.
pub async fn audio_chat(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let form = read_audio_form(payload, state.pipeline.validator()).await?;
    let reply = state
        .pipeline
        .conversation_turn(form.audio, form.session_id.as_deref())
        .await?;

    tracing::info!(
        session_id = %reply.session_id,
        turns = reply.history.len(),
        processing_time = reply.processing_time,
        "Audio chat turn completed"
    );

    Ok(HttpResponse::Ok().json(AudioChatResponse {
        session_id: reply.session_id,
        transcription: reply.transcription,
        response_text: reply.response_text,
        audio_base64: general_purpose::STANDARD.encode(&reply.audio),
        conversation_history: reply.history,
        processing_time: reply.processing_time,
    }))
}

/// `DELETE /audio-chat/{session_id}`
pub async fn delete_session(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let session_id = path.into_inner();
    state.sessions.delete(&session_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Session {} deleted", session_id)
    })))
}

/// `GET /audio-chat/{session_id}/history`
pub async fn session_history(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let session_id = path.into_inner();
    let history = state.sessions.history(&session_id).await?;

    Ok(HttpResponse::Ok().json(SessionHistoryResponse {
        message_count: history.len(),
        session_id,
        history,
    }))
}

#[cfg(test)]
mod tests {
    use crate::handlers::configure_routes;
    use crate::handlers::test_support::{state, TestState};
    use crate::handlers::upload::testing::MultipartBody;
    use crate::providers::mock::{MockChatModel, MockSynthesizer, MockTranscriber};
    use crate::session::SessionStore;
    use actix_web::http::header::CONTENT_TYPE;
    use actix_web::{test, web, App};
    use serde_json::Value;

    fn chat_state() -> TestState {
        state(
            MockTranscriber::ok("Hola, ¿cómo estás?"),
            MockChatModel::ok("¡Hola! Estoy bien."),
            MockSynthesizer::ok(&[0, 1]),
        )
    }

    fn chat_request(uri: &str, session_id: Option<&str>) -> test::TestRequest {
        let mut form = MultipartBody::new();
        if let Some(id) = session_id {
            form = form.text("session_id", id);
        }
        let (ct, body) = form.file("audio", "turn.mp3", "audio/mpeg", b"ID3data").finish();
        test::TestRequest::post()
            .uri(uri)
            .insert_header((CONTENT_TYPE, ct))
            .set_payload(body)
    }

    #[actix_web::test]
    async fn test_conversation_over_two_requests() {
        let ts = state(
            MockTranscriber::sequence(&["uno", "tres"]),
            MockChatModel::sequence(&["dos", "cuatro"]),
            MockSynthesizer::ok(&[0, 1]),
        );
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ts.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let resp = test::call_service(&app, chat_request("/audio-chat", None).to_request()).await;
        assert_eq!(resp.status(), 200);
        let first: Value = test::read_body_json(resp).await;
        let session_id = first["session_id"].as_str().unwrap().to_string();
        assert_eq!(first["conversation_history"].as_array().unwrap().len(), 2);
        assert_eq!(first["audio_base64"], "AAE=");

        let resp = test::call_service(
            &app,
            chat_request("/audio-chat/", Some(&session_id)).to_request(),
        )
        .await;
        assert_eq!(resp.status(), 200);
        let second: Value = test::read_body_json(resp).await;
        assert_eq!(second["session_id"], session_id.as_str());

        assert_eq!(second["transcription"], "tres");
        assert_eq!(second["response_text"], "cuatro");

        let history = second["conversation_history"].as_array().unwrap();
        let turns: Vec<(&str, &str)> = history
            .iter()
            .map(|t| (t["role"].as_str().unwrap(), t["content"].as_str().unwrap()))
            .collect();
        assert_eq!(
            turns,
            vec![
                ("user", "uno"),
                ("assistant", "dos"),
                ("user", "tres"),
                ("assistant", "cuatro"),
            ]
        );
        assert!(ts
            .chat
            .last_prompt()
            .unwrap()
            .starts_with("Conversation history:"));
    }

    #[actix_web::test]
    async fn test_history_then_delete() {
        let ts = chat_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ts.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let resp = test::call_service(&app, chat_request("/audio-chat", None).to_request()).await;
        let body: Value = test::read_body_json(resp).await;
        let session_id = body["session_id"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri(&format!("/audio-chat/{}/history", session_id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let history: Value = test::read_body_json(resp).await;
        assert_eq!(history["session_id"], session_id.as_str());
        assert_eq!(history["message_count"], 2);
        assert_eq!(history["history"][1]["content"], "¡Hola! Estoy bien.");

        let req = test::TestRequest::delete()
            .uri(&format!("/audio-chat/{}", session_id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let deleted: Value = test::read_body_json(resp).await;
        assert!(deleted["message"].as_str().unwrap().contains(&session_id));

        let req = test::TestRequest::get()
            .uri(&format!("/audio-chat/{}/history", session_id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
        let missing: Value = test::read_body_json(resp).await;
        assert_eq!(missing["error"], "not_found");
        assert!(ts.sessions.history(&session_id).await.is_err());
    }

    #[actix_web::test]
    async fn test_delete_unknown_session_is_404() {
        let ts = chat_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ts.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::delete().uri("/audio-chat/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn test_failed_synthesis_reports_stage() {
        let ts = state(
            MockTranscriber::ok("hola"),
            MockChatModel::ok("adiós"),
            MockSynthesizer::failing("voice unavailable"),
        );
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ts.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let resp = test::call_service(&app, chat_request("/audio-chat", None).to_request()).await;
        assert_eq!(resp.status(), 500);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "upstream_error");
        assert!(body["detail"].as_str().unwrap().contains("synthesis"));
    }
}
