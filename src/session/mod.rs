//! # Conversation Sessions
//!
//! A session is an ordered list of turns replayed as context for the next
//! reply. Sessions live in a [`SessionStore`]; the running service uses the
//! in-memory implementation, and anything else implementing the trait can
//! replace it without touching the pipeline.
//!
//! ## Mutation rule:
//! History only changes through [`SessionLease::record_exchange`], which
//! appends a user turn and its assistant turn together. A pipeline run that
//! fails never reaches that call, so a session is never left with an
//! unanswered user turn.
//!
//! ## Concurrency:
//! Holding a lease holds that session's lock. Two requests for the same
//! session run one after the other; requests for different sessions never
//! wait on each other.

pub mod store; // In-memory store with per-session locks

use crate::error::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

pub use store::InMemorySessionStore;

/// Who spoke a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One utterance in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Stored state of one session.
#[derive(Debug)]
pub struct Conversation {
    pub(crate) turns: Vec<Turn>,
    pub(crate) last_active: DateTime<Utc>,
}

impl Conversation {
    pub(crate) fn new() -> Self {
        Self {
            turns: Vec::new(),
            last_active: Utc::now(),
        }
    }
}

/// Exclusive access to one session for the length of a pipeline run.
pub struct SessionLease {
    id: String,
    created: bool,
    conversation: OwnedMutexGuard<Conversation>,
}

impl SessionLease {
    pub(crate) fn new(id: String, created: bool, conversation: OwnedMutexGuard<Conversation>) -> Self {
        Self {
            id,
            created,
            conversation,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// True when this lease minted the session.
    pub fn is_new(&self) -> bool {
        self.created
    }

    pub fn history(&self) -> &[Turn] {
        &self.conversation.turns
    }

    /// Append a completed user/assistant exchange.
    pub fn record_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.conversation.turns.push(Turn::user(user));
        self.conversation.turns.push(Turn::assistant(assistant));
        self.conversation.last_active = Utc::now();
    }
}

/// Session storage used by the stateful pipeline and the session endpoints.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Lease the session named by `id`, or a fresh one when `id` is absent
    /// or unknown. A fresh session gets a newly minted identifier.
    async fn get_or_create(&self, id: Option<&str>) -> SessionLease;

    /// Copy of the session's turns, oldest first.
    async fn history(&self, id: &str) -> AppResult<Vec<Turn>>;

    async fn delete(&self, id: &str) -> AppResult<()>;

    /// Drop sessions idle for longer than `max_idle` that nobody is using.
    /// Returns how many were removed.
    async fn evict_idle(&self, max_idle: Duration) -> usize;
}
