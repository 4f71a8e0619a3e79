//! Reply generation on top of a [`ChatModel`].

use crate::config::AppConfig;
use crate::providers::{ChatModel, UpstreamError};
use crate::session::{Role, Turn};
use std::sync::Arc;

pub struct ReplyGenerator {
    model: Arc<dyn ChatModel>,
    system_prompt: String,
    history_window: usize,
    fallback: String,
}

impl ReplyGenerator {
    pub fn new(
        model: Arc<dyn ChatModel>,
        response_language: &str,
        history_window: usize,
        fallback: impl Into<String>,
    ) -> Self {
        Self {
            model,
            system_prompt: system_prompt(response_language),
            history_window,
            fallback: fallback.into(),
        }
    }

    pub fn from_config(model: Arc<dyn ChatModel>, config: &AppConfig) -> Self {
        Self::new(
            model,
            &config.conversation.response_language,
            config.conversation.history_window,
            config.conversation.fallback_reply.clone(),
        )
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// User message sent to the model for `message` given prior `history`.
    ///
    /// With no history the message goes through unchanged. Otherwise the last
    /// `history_window` turns are rendered ahead of it, oldest first.
    pub fn prompt_for(&self, message: &str, history: &[Turn]) -> String {
        if history.is_empty() {
            return message.to_string();
        }
        render_context(history, self.history_window, message)
    }

    /// Ask the model for a reply. Never returns blank text.
    pub async fn reply(&self, prompt: &str) -> Result<String, UpstreamError> {
        let text = self.model.complete(self.system_prompt(), prompt).await?;
        let text = text.trim();

        if text.is_empty() {
            tracing::warn!("Chat model returned an empty reply, using fallback");
            return Ok(self.fallback.clone());
        }
        Ok(text.to_string())
    }
}

fn system_prompt(language: &str) -> String {
    format!(
        "You are a friendly and helpful voice assistant. \
         Answer concisely and naturally, as in a spoken conversation. \
         Keep replies short (2-3 sentences at most) so they are easy to speak aloud. \
         Always reply in {}.",
        language
    )
}

/// Context block for a follow-up turn.
///
/// ```text
/// Conversation history:
/// User: ...
/// Assistant: ...
///
/// User: <current>
/// Assistant:
/// ```
pub fn render_context(history: &[Turn], window: usize, current: &str) -> String {
    let start = history.len().saturating_sub(window);
    let mut prompt = String::from("Conversation history:\n");

    for turn in &history[start..] {
        let speaker = match turn.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        prompt.push_str(speaker);
        prompt.push_str(": ");
        prompt.push_str(&turn.content);
        prompt.push('\n');
    }

    prompt.push_str("\nUser: ");
    prompt.push_str(current);
    prompt.push_str("\nAssistant:");
    prompt
}
