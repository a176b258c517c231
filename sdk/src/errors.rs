//! Error types and handling
//!
//! This module provides the error types used throughout the Troupe engine.
//! All errors implement the `TroupeErrorExt` trait which provides
//! user-friendly hints and indicates whether errors are recoverable.
//!
//! Role execution failures are deliberately absent from this taxonomy at the
//! `process()` boundary: the orchestrator converts them into incomplete
//! responses instead of surfacing errors to callers.

use thiserror::Error;

/// Trait for Troupe error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait TroupeErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain
    /// internal implementation details.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around. Non-recoverable
    /// errors typically require fixing configuration and restarting.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: invalid or missing configuration, fatal at load time
/// - **Role**: registration/lifecycle failures (never per-request execution)
/// - **State**: persistence failures outside the degraded-mode hot path
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown role implementation: {0}")]
    UnknownImplementation(String),

    #[error("Duplicate role id: {0}")]
    DuplicateRoleId(String),

    // Role lifecycle errors
    #[error("Role error: {0}")]
    Role(String),

    #[error("Role not found: {0}")]
    RoleNotFound(String),

    // State persistence errors
    #[error("State error: {0}")]
    State(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TroupeErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your roles.json file for errors",
            Self::UnknownImplementation(_) => {
                "Role implementation not recognized. Check the implementation_ref value"
            }
            Self::DuplicateRoleId(_) => "Each role id must be unique in the configuration",
            Self::Role(_) => "Role failed to initialize. Check its configuration block",
            Self::RoleNotFound(_) => "The requested role is not registered",
            Self::State(_) => "State storage operation failed. Check the state database path",
            Self::Serialization(_) => "Failed to encode or decode data",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Configuration problems require fixing the document and restarting
            Self::Config(_) | Self::UnknownImplementation(_) | Self::DuplicateRoleId(_) => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}
