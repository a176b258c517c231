//! Troupe Engine Library
//!
//! This library provides the core functionality of the Troupe orchestration
//! engine. It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Role registry module
pub mod registry;

/// Orchestration engine module
pub mod orchestrator;

/// Conversation state persistence module
pub mod state;

/// Built-in role implementations and the role factory
pub mod roles;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
