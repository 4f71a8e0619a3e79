//! Scripted provider doubles shared by the pipeline and handler tests.

use crate::providers::{ChatModel, SpeechSynthesizer, Transcriber, UpstreamError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Result for call number `n`; the last entry repeats once the script runs out.
fn scripted<T: Clone>(script: &[Result<T, UpstreamError>], n: usize) -> Result<T, UpstreamError> {
    script[n.min(script.len() - 1)].clone()
}

/// Records each audio path it was handed and whether the file existed then.
pub struct MockTranscriber {
    script: Vec<Result<String, UpstreamError>>,
    pub seen: Mutex<Vec<(PathBuf, bool)>>,
}

impl MockTranscriber {
    pub fn ok(text: &str) -> Self {
        Self::sequence(&[text])
    }

    /// One transcription per call, in order.
    pub fn sequence(texts: &[&str]) -> Self {
        Self {
            script: texts.iter().map(|t| Ok(t.to_string())).collect(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            script: vec![Err(UpstreamError::new(message))],
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, audio: &Path, _language: &str) -> Result<String, UpstreamError> {
        let mut seen = self.seen.lock().unwrap();
        seen.push((audio.to_path_buf(), audio.exists()));
        scripted(&self.script, seen.len() - 1)
    }
}

/// Records every user message it was asked to complete.
pub struct MockChatModel {
    script: Vec<Result<String, UpstreamError>>,
    pub prompts: Mutex<Vec<String>>,
}

impl MockChatModel {
    pub fn ok(text: &str) -> Self {
        Self::sequence(&[text])
    }

    /// One reply per call, in order.
    pub fn sequence(replies: &[&str]) -> Self {
        Self {
            script: replies.iter().map(|r| Ok(r.to_string())).collect(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            script: vec![Err(UpstreamError::new(message))],
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn complete(&self, _system_prompt: &str, user_message: &str) -> Result<String, UpstreamError> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(user_message.to_string());
        scripted(&self.script, prompts.len() - 1)
    }
}

/// Returns fixed audio bytes and records the text it was asked to speak.
pub struct MockSynthesizer {
    result: Result<Vec<u8>, UpstreamError>,
    pub texts: Mutex<Vec<String>>,
}

impl MockSynthesizer {
    pub fn ok(audio: &[u8]) -> Self {
        Self {
            result: Ok(audio.to_vec()),
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(UpstreamError::new(message)),
            texts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, UpstreamError> {
        self.texts.lock().unwrap().push(text.to_string());
        self.result.clone()
    }
}
