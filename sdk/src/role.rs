//! Role trait and role-level errors
//!
//! This module defines the `BotRole` trait that all role implementations must
//! implement. A role is the unit of request-handling behavior: it carries a
//! stable id, a tag set and a priority for filtering, and an async `execute`
//! that produces a [`RoleResponse`].
//!
//! # Lifecycle
//!
//! A role is constructed once, `initialize` is called exactly once before
//! first use, `execute` is called zero or many times after initialization,
//! and `dispose` is called exactly once at shutdown. Implementations must
//! guard against repeated initialization: a second `initialize` call is a
//! no-op, never an error that tears down working state.

use crate::context::{RoleContext, RoleResponse};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Free-form configuration map handed to a role's `initialize`.
///
/// The engine passes this through unexamined; every key is owned by the role
/// implementation.
pub type RoleConfig = HashMap<String, serde_json::Value>;

/// Default priority assigned to roles that don't override [`BotRole::priority`]
pub const DEFAULT_PRIORITY: i32 = 50;

/// Trait that all roles must implement
///
/// Implementations must be `Send + Sync` so they can be shared as trait
/// objects across concurrent orchestration calls.
#[async_trait]
pub trait BotRole: Send + Sync {
    /// Stable unique identifier, immutable after construction
    fn id(&self) -> &str;

    /// Human-readable display name
    fn display_name(&self) -> &str;

    /// Tags used for filtering; iteration order must be deterministic
    fn tags(&self) -> &[String];

    /// Selection priority; higher runs first
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Whether this role can handle the given request
    fn can_handle(&self, context: &RoleContext) -> bool;

    /// Called exactly once before first use; repeated calls must be a no-op
    async fn initialize(&self, config: &RoleConfig) -> Result<(), RoleError> {
        let _ = config;
        Ok(())
    }

    /// Handle a request and produce a response
    async fn execute(&self, context: &RoleContext) -> Result<RoleResponse, RoleError>;

    /// Called exactly once at shutdown; no operations are valid afterwards
    async fn dispose(&self) -> Result<(), RoleError> {
        Ok(())
    }
}

/// Role-specific errors
///
/// Raised by role implementations; the orchestrator converts execution
/// failures into incomplete responses rather than propagating them.
#[derive(Debug, Error)]
pub enum RoleError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Role not initialized")]
    NotInitialized,

    #[error("Role already disposed")]
    Disposed,

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}
