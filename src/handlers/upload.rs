//! # Multipart Upload Reader
//!
//! Pulls the `audio` file part (and the optional `session_id` text part) out
//! of a multipart body.
//!
//! The extension is checked as soon as the part header arrives, and the body
//! is read chunk by chunk so an oversized upload is rejected at the limit
//! instead of being buffered in full. Empty and full-size checks run again in
//! the pipeline on the complete upload.

use crate::audio::{AudioValidator, UploadedAudio};
use crate::error::{AppError, AppResult};
use actix_multipart::{Field, Multipart};
use actix_web::web::{Bytes, BytesMut};
use futures_util::stream::StreamExt;

/// Longest accepted `session_id` value, in bytes.
const MAX_TEXT_FIELD_BYTES: usize = 1024;

#[derive(Debug)]
pub struct AudioForm {
    pub audio: UploadedAudio,
    /// Trimmed; `None` when missing or blank
    pub session_id: Option<String>,
}

pub async fn read_audio_form(mut payload: Multipart, validator: &AudioValidator) -> AppResult<AudioForm> {
    let mut audio = None;
    let mut session_id = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;

        let (name, filename) = {
            let disposition = field
                .content_disposition()
                .ok_or_else(|| AppError::BadRequest("Missing content disposition".to_string()))?;
            (
                disposition.get_name().unwrap_or_default().to_string(),
                disposition.get_filename().map(|s| s.to_string()),
            )
        };

        match name.as_str() {
            "audio" => {
                let filename = filename.unwrap_or_default();
                validator.check_extension(&filename)?;

                let content_type = field.content_type().map(|mime| mime.to_string());
                let bytes = read_capped(&mut field, validator).await?;
                tracing::debug!(filename = %filename, bytes = bytes.len(), "Received audio part");
                audio = Some(UploadedAudio::new(filename, content_type, bytes));
            }
            "session_id" => {
                let value = read_text(&mut field).await?;
                let value = value.trim();
                if !value.is_empty() {
                    session_id = Some(value.to_string());
                }
            }
            other => {
                tracing::debug!(field = %other, "Ignoring unexpected multipart field");
                drain(&mut field).await?;
            }
        }
    }

    let audio = audio.ok_or_else(|| AppError::BadRequest("Missing 'audio' file part".to_string()))?;
    Ok(AudioForm { audio, session_id })
}

async fn read_capped(field: &mut Field, validator: &AudioValidator) -> AppResult<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Chunk error: {}", e)))?;
        buf.extend_from_slice(&chunk);
        validator.check_limit(buf.len() as u64)?;
    }
    Ok(buf.freeze())
}

async fn read_text(field: &mut Field) -> AppResult<String> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Chunk error: {}", e)))?;
        buf.extend_from_slice(&chunk);
        if buf.len() > MAX_TEXT_FIELD_BYTES {
            return Err(AppError::BadRequest("Text field too long".to_string()));
        }
    }
    String::from_utf8(buf).map_err(|_| AppError::BadRequest("Text field is not valid UTF-8".to_string()))
}

async fn drain(field: &mut Field) -> AppResult<()> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|e| AppError::BadRequest(format!("Chunk error: {}", e)))?;
    }
    Ok(())
}
