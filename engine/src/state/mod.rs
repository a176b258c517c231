//! Conversation state persistence
//!
//! Associates a `conversation_id` with a persisted key-value map. The
//! `StateManager` keeps an in-memory cache fronting a durable
//! [`StateBackend`]; the orchestrator hydrates context state before a run
//! and persists it afterwards.
//!
//! Backend failures in the orchestration hot path are degraded-mode
//! recoverable: a failed load falls back to empty state and a failed save
//! leaves the cache authoritative, both logged as warnings rather than
//! failing the request.

use async_trait::async_trait;
use sdk::context::StateMap;
use sdk::RoleContext;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

pub mod sqlite;

pub use sqlite::SqliteStateBackend;

/// Result type for state operations
pub type Result<T> = std::result::Result<T, StateError>;

/// Errors that can occur in the state layer
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One durable record per conversation id
#[derive(Debug, Clone)]
pub struct ConversationRecord {
    pub conversation_id: String,
    pub user_id: String,
    pub state: StateMap,
    pub session_data: StateMap,
    pub last_updated: i64,
}

impl ConversationRecord {
    /// Build a record from a context, stamped with the current time
    pub fn from_context(context: &RoleContext) -> Self {
        Self {
            conversation_id: context.conversation_id.clone(),
            user_id: context.user_id.clone(),
            state: context.state.clone(),
            session_data: StateMap::new(),
            last_updated: unix_now(),
        }
    }
}

/// Durable storage contract for conversation state
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Fetch the record for a conversation id, if any
    async fn get(&self, conversation_id: &str) -> Result<Option<ConversationRecord>>;

    /// Insert or replace the record for its conversation id
    async fn set(&self, record: &ConversationRecord) -> Result<()>;

    /// Delete the record for a conversation id; no-op if absent
    async fn delete(&self, conversation_id: &str) -> Result<()>;

    /// Conversation ids whose `last_updated` is strictly before the cutoff
    async fn list_older_than(&self, cutoff: i64) -> Result<Vec<String>>;
}

/// In-memory backend used by tests and when persistence is disabled
#[derive(Default)]
pub struct MemoryBackend {
    records: RwLock<HashMap<String, ConversationRecord>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateBackend for MemoryBackend {
    async fn get(&self, conversation_id: &str) -> Result<Option<ConversationRecord>> {
        let records = self.records.read().expect("MemoryBackend lock poisoned");
        Ok(records.get(conversation_id).cloned())
    }

    async fn set(&self, record: &ConversationRecord) -> Result<()> {
        let mut records = self.records.write().expect("MemoryBackend lock poisoned");
        records.insert(record.conversation_id.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, conversation_id: &str) -> Result<()> {
        let mut records = self.records.write().expect("MemoryBackend lock poisoned");
        records.remove(conversation_id);
        Ok(())
    }

    async fn list_older_than(&self, cutoff: i64) -> Result<Vec<String>> {
        let records = self.records.read().expect("MemoryBackend lock poisoned");
        Ok(records
            .values()
            .filter(|r| r.last_updated < cutoff)
            .map(|r| r.conversation_id.clone())
            .collect())
    }
}

/// Per-conversation state manager: in-memory cache over a durable backend
///
/// The cache lock is never held across a backend await; state is snapshotted
/// out and merged back in around backend calls.
pub struct StateManager {
    cache: RwLock<HashMap<String, StateMap>>,
    backend: Box<dyn StateBackend>,
}

impl StateManager {
    /// Create a manager over the given backend
    pub fn new(backend: Box<dyn StateBackend>) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            backend,
        }
    }

    /// Create a manager over an in-memory backend
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    /// Populate `context.state` for its conversation id
    ///
    /// Cache hit wins; otherwise the backend is consulted. "Not found" and
    /// backend failures both leave the state empty, the latter with a
    /// warning.
    pub async fn load(&self, context: &mut RoleContext) {
        if context.conversation_id.is_empty() {
            return;
        }

        let cached = {
            let cache = self.cache.read().expect("StateManager lock poisoned");
            cache.get(&context.conversation_id).cloned()
        };

        if let Some(state) = cached {
            debug!(
                "Loaded state for conversation '{}' from cache ({} keys)",
                context.conversation_id,
                state.len()
            );
            context.state = state;
            return;
        }

        match self.backend.get(&context.conversation_id).await {
            Ok(Some(record)) => {
                debug!(
                    "Loaded state for conversation '{}' from backend ({} keys)",
                    context.conversation_id,
                    record.state.len()
                );
                {
                    let mut cache = self.cache.write().expect("StateManager lock poisoned");
                    cache.insert(context.conversation_id.clone(), record.state.clone());
                }
                context.state = record.state;
            }
            Ok(None) => {
                debug!(
                    "No stored state for conversation '{}'",
                    context.conversation_id
                );
            }
            Err(e) => {
                warn!(
                    "State load failed for conversation '{}', proceeding with empty state: {}",
                    context.conversation_id, e
                );
            }
        }
    }

    /// Persist `context.state` for its conversation id
    ///
    /// A no-op when the conversation id is empty. A backend write failure is
    /// logged as a warning; the cache still holds the state.
    pub async fn save(&self, context: &RoleContext) {
        if context.conversation_id.is_empty() {
            return;
        }

        {
            let mut cache = self.cache.write().expect("StateManager lock poisoned");
            cache.insert(context.conversation_id.clone(), context.state.clone());
        }

        let record = ConversationRecord::from_context(context);
        if let Err(e) = self.backend.set(&record).await {
            warn!(
                "State save failed for conversation '{}': {}",
                context.conversation_id, e
            );
        } else {
            debug!(
                "Saved state for conversation '{}' ({} keys)",
                context.conversation_id,
                context.state.len()
            );
        }
    }

    /// Remove all stored state for a conversation
    pub async fn clear(&self, conversation_id: &str) -> Result<()> {
        {
            let mut cache = self.cache.write().expect("StateManager lock poisoned");
            cache.remove(conversation_id);
        }
        self.backend.delete(conversation_id).await
    }

    /// Prune conversations idle longer than `max_age`
    ///
    /// Returns the number of conversations removed. Not in the orchestration
    /// hot path.
    pub async fn cleanup_older_than(&self, max_age: Duration) -> Result<usize> {
        let cutoff = unix_now() - max_age.as_secs() as i64;
        let stale = self.backend.list_older_than(cutoff).await?;

        for conversation_id in &stale {
            self.backend.delete(conversation_id).await?;
            let mut cache = self.cache.write().expect("StateManager lock poisoned");
            cache.remove(conversation_id);
        }

        debug!("Cleaned up {} stale conversations", stale.len());
        Ok(stale.len())
    }
}

/// Current unix epoch timestamp in seconds
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
