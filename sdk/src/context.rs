//! Request context and response envelopes
//!
//! `RoleContext` is the mutable request envelope that flows through every
//! role invoked in a single orchestration run; `RoleResponse` is what each
//! role hands back. Absent fields default to empty containers, never nulls,
//! so roles never need null-checks on the envelope.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

/// Conversation-scoped key-value state
pub type StateMap = HashMap<String, serde_json::Value>;

/// The request envelope passed to every role in an orchestration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleContext {
    /// Request identifier; generated by the engine when empty
    #[serde(default)]
    pub request_id: String,

    /// Conversation identifier; empty means the request is not persisted
    #[serde(default)]
    pub conversation_id: String,

    /// User identifier
    #[serde(default)]
    pub user_id: String,

    /// The payload to route; may be empty
    #[serde(default)]
    pub input: String,

    /// Mutable conversation state, shared across every role in one run
    #[serde(default)]
    pub state: StateMap,

    /// Creation time, used to compute durations
    #[serde(default = "SystemTime::now")]
    pub timestamp: SystemTime,
}

impl RoleContext {
    /// Create a new context for the given input
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            request_id: String::new(),
            conversation_id: String::new(),
            user_id: String::new(),
            input: input.into(),
            state: StateMap::new(),
            timestamp: SystemTime::now(),
        }
    }

    /// Set the request id
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    /// Set the conversation id
    pub fn with_conversation(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = id.into();
        self
    }

    /// Set the user id
    pub fn with_user(mut self, id: impl Into<String>) -> Self {
        self.user_id = id.into();
        self
    }

    /// Set a state entry
    pub fn with_state(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.state.insert(key.into(), value);
        self
    }

    /// Get a state value as a string
    pub fn state_str(&self, key: &str) -> Option<String> {
        self.state.get(key).and_then(|v| v.as_str()).map(String::from)
    }

    /// Get a state value as an i64
    pub fn state_i64(&self, key: &str) -> Option<i64> {
        self.state.get(key).and_then(|v| v.as_i64())
    }

    /// Milliseconds elapsed since the context was created
    pub fn elapsed_ms(&self) -> u128 {
        self.timestamp.elapsed().map(|d| d.as_millis()).unwrap_or(0)
    }
}

/// The response envelope produced by a role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleResponse {
    /// Human-facing output; may be empty when `is_complete` is false
    pub content: String,

    /// True when the role produced a final, usable answer; false signals a
    /// soft failure the caller should treat as "could not help"
    pub is_complete: bool,

    /// Delta to merge into the context's state after this role runs
    #[serde(default)]
    pub updated_state: StateMap,

    /// Role ids to feed this response's content to next (pipeline mode only);
    /// empty means end of pipeline
    #[serde(default)]
    pub next_roles: Vec<String>,

    /// Diagnostic payload (timing, which role ran, errors); additive only,
    /// never semantically required downstream
    #[serde(default)]
    pub metadata: StateMap,
}

impl RoleResponse {
    /// Create a complete response with the given content
    pub fn complete(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_complete: true,
            updated_state: StateMap::new(),
            next_roles: Vec::new(),
            metadata: StateMap::new(),
        }
    }

    /// Create an incomplete ("could not help") response
    pub fn incomplete(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_complete: false,
            updated_state: StateMap::new(),
            next_roles: Vec::new(),
            metadata: StateMap::new(),
        }
    }

    /// Add a state delta entry
    pub fn with_state(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.updated_state.insert(key.into(), value);
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Set the roles to feed this response's content to next
    pub fn with_next_roles(mut self, roles: Vec<String>) -> Self {
        self.next_roles = roles;
        self
    }

    /// Convert to a JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
