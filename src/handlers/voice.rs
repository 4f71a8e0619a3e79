//! Stateless voice endpoints: one upload in, one spoken reply out.

use crate::error::AppError;
use crate::handlers::upload::read_audio_form;
use crate::providers::openai::SPEECH_CONTENT_TYPE;
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::http::header::HeaderValue;
use actix_web::{web, HttpResponse};
use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;

/// Longest transcription / reply echoed in a response header, in characters.
const HEADER_TEXT_LIMIT: usize = 100;

#[derive(Debug, Serialize)]
pub struct VoiceAgentResponse {
    pub transcription: String,
    pub response_text: String,
    pub audio_base64: String,
    pub processing_time: f64,
}

/// Process a voice recording and return the reply as JSON.
///
/// ## Endpoint: `POST /voice-agent`
///
/// ## Request:
/// Multipart form data with an audio file field named "audio"
///
/// ## Response:
/// ```json
/// {
///   "transcription": "Hola, ¿cómo estás?",
///   "response_text": "¡Hola! Estoy bien.",
///   "audio_base64": "AAE=",
///   "processing_time": 1.42
/// }
/// ```
pub async fn voice_agent(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let form = read_audio_form(payload, state.pipeline.validator()).await?;
    let reply = state.pipeline.single_turn(form.audio).await?;

    tracing::info!(processing_time = reply.processing_time, "Voice agent request completed");

    Ok(HttpResponse::Ok().json(VoiceAgentResponse {
        transcription: reply.transcription,
        response_text: reply.response_text,
        audio_base64: general_purpose::STANDARD.encode(&reply.audio),
        processing_time: reply.processing_time,
    }))
}

/// Same pipeline as [`voice_agent`], but the body is the synthesized audio.
///
/// ## Endpoint: `POST /voice-agent-audio`
///
/// ## Response headers:
/// - `Content-Type: audio/mpeg`
/// - `X-Transcription` / `X-Response-Text`: first 100 characters, control
///   characters removed
/// - `X-Processing-Time`: seconds
pub async fn voice_agent_audio(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let form = read_audio_form(payload, state.pipeline.validator()).await?;
    let reply = state.pipeline.single_turn(form.audio).await?;

    Ok(HttpResponse::Ok()
        .content_type(SPEECH_CONTENT_TYPE)
        .insert_header(("X-Transcription", header_text(&reply.transcription)?))
        .insert_header(("X-Response-Text", header_text(&reply.response_text)?))
        .insert_header(("X-Processing-Time", reply.processing_time.to_string()))
        .body(reply.audio))
}

/// Header-safe version of free text.
///
/// Non-ASCII characters are kept as raw UTF-8 bytes, which header values
/// allow as opaque octets.
fn header_text(text: &str) -> Result<HeaderValue, AppError> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_control())
        .take(HEADER_TEXT_LIMIT)
        .collect();
    HeaderValue::from_bytes(cleaned.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid header text: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::configure_routes;
    use crate::handlers::test_support::{state, TestState};
    use crate::handlers::upload::testing::MultipartBody;
    use crate::providers::mock::{MockChatModel, MockSynthesizer, MockTranscriber};
    use actix_web::http::header::CONTENT_TYPE;
    use actix_web::{test, App};
    use serde_json::Value;

    fn wav_upload() -> (String, Vec<u8>) {
        MultipartBody::new()
            .file("audio", "hola.wav", "audio/wav", b"RIFF....WAVEfmt ")
            .finish()
    }

    fn worked_example() -> TestState {
        state(
            MockTranscriber::ok("Hola, ¿cómo estás?"),
            MockChatModel::ok("¡Hola! Estoy bien."),
            MockSynthesizer::ok(&[0, 1]),
        )
    }

    #[actix_web::test]
    async fn test_header_text_strips_controls_and_truncates() {
        let long = format!("line one\nline\ttwo {}", "x".repeat(200));
        let value = header_text(&long).unwrap();
        let text = std::str::from_utf8(value.as_bytes()).unwrap();

        assert!(text.starts_with("line onelinetwo "));
        assert_eq!(text.chars().count(), HEADER_TEXT_LIMIT);
    }

    #[actix_web::test]
    async fn test_header_text_keeps_non_ascii() {
        let value = header_text("¿Qué tal?").unwrap();
        assert_eq!(value.as_bytes(), "¿Qué tal?".as_bytes());
    }

    #[actix_web::test]
    async fn test_voice_agent_returns_exact_fields() {
        let ts = worked_example();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ts.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let (ct, body) = wav_upload();
        let req = test::TestRequest::post()
            .uri("/voice-agent")
            .insert_header((CONTENT_TYPE, ct))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let json: Value = test::read_body_json(resp).await;
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 4);
        assert_eq!(json["transcription"], "Hola, ¿cómo estás?");
        assert_eq!(json["response_text"], "¡Hola! Estoy bien.");
        assert_eq!(json["audio_base64"], "AAE=");
        assert!(json["processing_time"].as_f64().unwrap() >= 0.0);
    }

    #[actix_web::test]
    async fn test_voice_agent_rejects_wrong_extension() {
        let ts = worked_example();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ts.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let (ct, body) = MultipartBody::new()
            .file("audio", "notes.txt", "text/plain", b"hello")
            .finish();
        let req = test::TestRequest::post()
            .uri("/voice-agent")
            .insert_header((CONTENT_TYPE, ct))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["error"], "invalid_format");
        assert_eq!(ts.transcriber.calls(), 0);
    }

    #[actix_web::test]
    async fn test_voice_agent_empty_file() {
        let ts = worked_example();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ts.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let (ct, body) = MultipartBody::new()
            .file("audio", "empty.wav", "audio/wav", b"")
            .finish();
        let req = test::TestRequest::post()
            .uri("/voice-agent")
            .insert_header((CONTENT_TYPE, ct))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["error"], "empty_file");
    }

    #[actix_web::test]
    async fn test_voice_agent_upstream_failure_is_500() {
        let ts = state(
            MockTranscriber::ok("hola"),
            MockChatModel::failing("status 429: rate limited"),
            MockSynthesizer::ok(&[0]),
        );
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ts.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let (ct, body) = wav_upload();
        let req = test::TestRequest::post()
            .uri("/voice-agent")
            .insert_header((CONTENT_TYPE, ct))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 500);

        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["error"], "upstream_error");
        assert!(json["detail"].as_str().unwrap().contains("reply"));
    }

    #[actix_web::test]
    async fn test_voice_agent_audio_returns_mp3_with_headers() {
        let ts = worked_example();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ts.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let (ct, body) = wav_upload();
        let req = test::TestRequest::post()
            .uri("/voice-agent-audio")
            .insert_header((CONTENT_TYPE, ct))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let headers = resp.headers();
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "audio/mpeg");
        assert_eq!(
            headers.get("X-Transcription").unwrap().as_bytes(),
            "Hola, ¿cómo estás?".as_bytes()
        );
        assert_eq!(
            headers.get("X-Response-Text").unwrap().as_bytes(),
            "¡Hola! Estoy bien.".as_bytes()
        );
        assert!(headers.contains_key("X-Processing-Time"));

        let bytes = test::read_body(resp).await;
        assert_eq!(bytes.as_ref(), &[0u8, 1]);
        assert_eq!(ts.synthesizer.texts.lock().unwrap().len(), 1);
    }
}
