use crate::error::{AppError, AppResult};
use crate::session::{Conversation, SessionLease, SessionStore, Turn};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

type SessionEntry = Arc<Mutex<Conversation>>;

/// Process-lifetime session map.
///
/// The outer lock only guards the map itself and is never held across an
/// await on a session. Each session has its own mutex, which a
/// [`SessionLease`] keeps for as long as it lives.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, id: &str) -> Option<SessionEntry> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Whether `entry` is still the one published under `id`.
    async fn is_current(&self, id: &str, entry: &SessionEntry) -> bool {
        self.sessions
            .read()
            .await
            .get(id)
            .is_some_and(|current| Arc::ptr_eq(current, entry))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, id: Option<&str>) -> SessionLease {
        if let Some(id) = id {
            if let Some(entry) = self.entry(id).await {
                let guard = entry.clone().lock_owned().await;
                // Evicted or deleted while we waited for the lock
                if self.is_current(id, &entry).await {
                    tracing::debug!(session_id = %id, "Continuing session");
                    return SessionLease::new(id.to_string(), false, guard);
                }
                tracing::debug!(session_id = %id, "Session removed while waiting, starting a new one");
            }
        }

        let id = Uuid::new_v4().to_string();
        let entry: SessionEntry = Arc::new(Mutex::new(Conversation::new()));
        // Lock before publishing so no one else can use it first
        let guard = entry.clone().lock_owned().await;
        self.sessions.write().await.insert(id.clone(), entry);

        tracing::info!(session_id = %id, "Created new session");
        SessionLease::new(id, true, guard)
    }

    async fn history(&self, id: &str) -> AppResult<Vec<Turn>> {
        let entry = self
            .entry(id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("session {}", id)))?;
        let conversation = entry.lock().await;
        Ok(conversation.turns.clone())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        match self.sessions.write().await.remove(id) {
            Some(_) => {
                tracing::info!(session_id = %id, "Deleted session");
                Ok(())
            }
            None => Err(AppError::NotFound(format!("session {}", id))),
        }
    }

    async fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|_, entry| match entry.try_lock() {
            Ok(conversation) => {
                let idle = (now - conversation.last_active).to_std().unwrap_or_default();
                idle <= max_idle
            }
            // Leased right now, so not idle
            Err(_) => true,
        });

        before - sessions.len()
    }
}
