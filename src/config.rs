//! # Configuration Management
//!
//! Loads the service configuration from multiple sources:
//! - Default values (built into the code)
//! - TOML configuration file (config.toml, optional)
//! - Environment variables with the APP_ prefix (nested keys joined by `__`)
//! - Plain deployment variables (OPENAI_API_KEY, PORT, MAX_AUDIO_SIZE_MB, ...)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Plain deployment variables (see [`ENV_OVERRIDES`])
//! 2. APP_ variables (APP_SERVER__PORT, APP_AUDIO__MAX_AUDIO_SIZE_MB, etc.)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Plain environment variables mapped onto configuration keys.
///
/// These don't follow the APP_ prefix convention but are what deployment
/// platforms and `.env` files for this service commonly set.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("HOST", "server.host"),
    ("PORT", "server.port"),
    ("DEBUG", "app.debug"),
    ("OPENAI_API_KEY", "provider.api_key"),
    ("OPENAI_BASE_URL", "provider.base_url"),
    ("MAX_AUDIO_SIZE_MB", "audio.max_audio_size_mb"),
    ("ALLOWED_AUDIO_FORMATS", "audio.allowed_audio_formats"),
    ("ASR_MODEL", "models.asr_model"),
    ("LLM_MODEL", "models.llm_model"),
    ("TTS_MODEL", "models.tts_model"),
    ("TTS_VOICE", "models.tts_voice"),
];

/// Main application configuration that contains all settings.
///
/// Breaking configuration into logical groups (server, provider, models,
/// audio, conversation) keeps each pipeline component's knobs together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub app: AppSection,
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub models: ModelsConfig,
    pub audio: AudioConfig,
    pub conversation: ConversationConfig,
}

/// Service identity and the debug switch.
///
/// `debug` raises the default log level when `RUST_LOG` is not set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSection {
    pub name: String,
    pub debug: bool,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Upstream AI provider connection settings.
///
/// ## Fields:
/// - `api_key`: Bearer credential sent with every provider call
/// - `base_url`: OpenAI-compatible API root (no trailing slash needed)
/// - `timeout_secs`: Upper bound for a single provider call; a timeout is
///   reported as an upstream error instead of hanging the request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Model identifiers for the three pipeline stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub asr_model: String,
    pub llm_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    /// Token cap for a single reply (keeps spoken answers short)
    pub max_reply_tokens: u32,
    pub temperature: f32,
}

/// Upload validation and temp file settings.
///
/// ## Fields:
/// - `max_audio_size_mb`: Largest accepted upload, in megabytes
/// - `allowed_audio_formats`: Comma separated extension list (".wav,.mp3")
/// - `temp_dir`: Scoped working directory for request temp files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub max_audio_size_mb: u64,
    pub allowed_audio_formats: String,
    pub temp_dir: PathBuf,
}

/// Conversation behaviour for the reply and session stages.
///
/// ## Fields:
/// - `language`: Language hint passed to speech-to-text (ISO 639-1 code)
/// - `response_language`: Language the assistant is instructed to reply in
/// - `history_window`: How many stored turns are replayed as context
/// - `session_ttl_secs`: Idle time after which a session is evicted (0 = never)
/// - `fallback_reply`: Spoken when the chat model returns nothing usable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    pub language: String,
    pub response_language: String,
    pub history_window: usize,
    pub session_ttl_secs: u64,
    pub fallback_reply: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection {
                name: "Voice Agent AI".to_string(),
                debug: false,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            provider: ProviderConfig {
                api_key: String::new(), // Must come from OPENAI_API_KEY or config.toml
                base_url: "https://api.openai.com/v1".to_string(),
                timeout_secs: 30,
            },
            models: ModelsConfig {
                asr_model: "gpt-4o-mini-transcribe".to_string(),
                llm_model: "gpt-4o-mini".to_string(),
                tts_model: "gpt-4o-mini-tts".to_string(),
                tts_voice: "alloy".to_string(),
                max_reply_tokens: 150,
                temperature: 0.7,
            },
            audio: AudioConfig {
                max_audio_size_mb: 10,
                allowed_audio_formats: ".wav,.mp3".to_string(),
                temp_dir: PathBuf::from("temp_audio"),
            },
            conversation: ConversationConfig {
                language: "es".to_string(),
                response_language: "Spanish".to_string(),
                history_window: 6,
                session_ttl_secs: 0,
                fallback_reply: "Lo siento, no pude generar una respuesta.".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__PORT=3000`: Override server port
    /// - `APP_CONVERSATION__HISTORY_WINDOW=10`: Replay more context
    /// - `OPENAI_API_KEY=sk-...`: Provider credential
    /// - `MAX_AUDIO_SIZE_MB=25`: Raise the upload limit
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        for (var, key) in ENV_OVERRIDES {
            if let Ok(value) = env::var(var) {
                settings = settings.set_override(*key, value)?;
            }
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// Catching configuration errors at startup gives a clear message
    /// instead of every request failing upstream.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.provider.api_key.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "Provider API key is missing (set OPENAI_API_KEY or provider.api_key)"
            ));
        }

        if self.provider.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Provider timeout must be greater than 0"));
        }

        if self.audio.max_audio_size_mb == 0 {
            return Err(anyhow::anyhow!("Max audio size must be greater than 0"));
        }

        if self.audio.allowed_extensions().is_empty() {
            return Err(anyhow::anyhow!("At least one audio format must be allowed"));
        }

        if self.conversation.fallback_reply.trim().is_empty() {
            return Err(anyhow::anyhow!("Fallback reply cannot be empty"));
        }

        Ok(())
    }

    /// Normalized allow-set: lowercase extensions without the leading dot.
    ///
    /// `".WAV, mp3,,"` becomes `["wav", "mp3"]`.
    pub fn allowed_extensions(&self) -> Vec<String> {
        self.audio.allowed_extensions()
    }
}

impl AudioConfig {
    fn allowed_extensions(&self) -> Vec<String> {
        self.allowed_audio_formats
            .split(',')
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect()
    }
}
