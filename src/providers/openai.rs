//! OpenAI-compatible implementation of all three provider traits.
//!
//! - `POST {base_url}/audio/transcriptions` (multipart)
//! - `POST {base_url}/chat/completions` (JSON)
//! - `POST {base_url}/audio/speech` (JSON in, mp3 bytes out)

use crate::config::AppConfig;
use crate::providers::{ChatModel, SpeechSynthesizer, Transcriber, UpstreamError};
use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Audio container requested from the speech endpoint.
pub const SPEECH_FORMAT: &str = "mp3";

/// Content type matching [`SPEECH_FORMAT`].
pub const SPEECH_CONTENT_TYPE: &str = "audio/mpeg";

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    asr_model: String,
    llm_model: String,
    tts_model: String,
    tts_voice: String,
    max_reply_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'static str,
}

impl OpenAiProvider {
    /// Build the provider with a client whose every request is bounded by
    /// `provider.timeout_secs`.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.provider.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: config.provider.api_key.clone(),
            base_url: config.provider.base_url.trim_end_matches('/').to_string(),
            asr_model: config.models.asr_model.clone(),
            llm_model: config.models.llm_model.clone(),
            tts_model: config.models.tts_model.clone(),
            tts_voice: config.models.tts_voice.clone(),
            max_reply_tokens: config.models.max_reply_tokens,
            temperature: config.models.temperature,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    fn chat_request<'a>(&'a self, system_prompt: &'a str, user_message: &'a str) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.llm_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            max_tokens: self.max_reply_tokens,
            temperature: self.temperature,
        }
    }
}

/// Turn a non-2xx response into an error that keeps the provider's body.
async fn ensure_success(response: Response) -> Result<Response, UpstreamError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    Err(UpstreamError::new(format!("status {}: {}", status, body)))
}

fn first_choice_text(response: ChatCompletionResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default()
}

#[async_trait]
impl Transcriber for OpenAiProvider {
    async fn transcribe(&self, audio: &Path, language: &str) -> Result<String, UpstreamError> {
        let bytes = tokio::fs::read(audio)
            .await
            .map_err(|e| UpstreamError::new(format!("could not read audio file: {}", e)))?;

        // The file name carries the extension the provider uses to detect the format
        let file_name = audio
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("audio")
            .to_string();

        let file_part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;

        let form = multipart::Form::new()
            .text("model", self.asr_model.clone())
            .text("language", language.to_string())
            .part("file", file_part);

        tracing::debug!(model = %self.asr_model, language, "Sending audio for transcription");

        let response = self
            .client
            .post(self.url("audio/transcriptions"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let body: TranscriptionResponse = ensure_success(response).await?.json().await?;
        Ok(body.text.trim().to_string())
    }
}

#[async_trait]
impl ChatModel for OpenAiProvider {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, UpstreamError> {
        tracing::debug!(model = %self.llm_model, "Requesting chat completion");

        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&self.chat_request(system_prompt, user_message))
            .send()
            .await?;

        let body: ChatCompletionResponse = ensure_success(response).await?.json().await?;
        Ok(first_choice_text(body))
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiProvider {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, UpstreamError> {
        tracing::debug!(model = %self.tts_model, voice = %self.tts_voice, "Requesting speech synthesis");

        let request = SpeechRequest {
            model: &self.tts_model,
            voice: &self.tts_voice,
            input: text,
            response_format: SPEECH_FORMAT,
        };

        let response = self
            .client
            .post(self.url("audio/speech"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let audio = ensure_success(response).await?.bytes().await?;
        Ok(audio.to_vec())
    }
}
