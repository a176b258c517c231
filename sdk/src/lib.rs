//! Troupe SDK
//!
//! Shared library providing the role trait, request/response envelopes, and
//! error types for the Troupe orchestration engine. This crate is used by
//! the engine and by anyone authoring role implementations.

/// Role trait and role-level errors
pub mod role;

/// Request context and response envelopes
pub mod context;

/// Execution modes and orchestration configuration
pub mod orchestration;

/// Error types and handling
pub mod errors;

// Re-export commonly used types
pub use context::{RoleContext, RoleResponse};
pub use errors::{EngineError, TroupeErrorExt};
pub use orchestration::{ExecutionMode, OrchestrationConfig};
pub use role::{BotRole, RoleConfig, RoleError};
