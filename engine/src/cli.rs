//! CLI interface for Troupe
//!
//! This module provides the command-line interface using clap's derive API.
//! The binary is a one-shot administrative surface: run one orchestration,
//! list roles, or manage stored conversation state. Exit code 0 covers
//! every valid outcome including "no suitable role" responses; non-zero is
//! reserved for fatal configuration/startup errors.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Troupe role orchestration engine
///
/// Routes requests to pluggable roles by tag and priority, runs them under
/// one of four execution modes, and persists conversation state between
/// calls.
#[derive(Parser, Debug)]
#[command(name = "troupe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one orchestration and print the response
    Process {
        /// The request input to route
        #[arg(long)]
        input: String,

        /// Conversation id; omit for a conversation-less (unpersisted) request
        #[arg(long)]
        conversation: Option<String>,

        /// User id
        #[arg(long)]
        user: Option<String>,

        /// Execution mode (first-match, sequential, parallel, pipeline);
        /// defaults to the configured mode
        #[arg(long)]
        mode: Option<String>,

        /// Explicit role ids to run, in order (bypasses tag filtering)
        #[arg(long, value_delimiter = ',')]
        roles: Vec<String>,

        /// Only roles owning at least one of these tags are candidates
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Remove candidates owning any of these tags
        #[arg(long, value_delimiter = ',')]
        exclude_tags: Vec<String>,

        /// Sequential mode: stop the chain at the first incomplete step
        #[arg(long)]
        stop_on_failure: bool,
    },

    /// List registered roles (id, priority, tags)
    Roles,

    /// Manage stored conversation state
    State {
        #[command(subcommand)]
        action: StateAction,
    },
}

/// Conversation state management actions
#[derive(Subcommand, Debug)]
pub enum StateAction {
    /// Print stored state for a conversation
    Show {
        /// Conversation id
        #[arg(long)]
        conversation: String,
    },

    /// Delete stored state for a conversation
    Clear {
        /// Conversation id
        #[arg(long)]
        conversation: String,
    },

    /// Prune conversations idle longer than the given age
    Cleanup {
        /// Age threshold in hours; defaults to the configured cleanup interval
        #[arg(long)]
        older_than_hours: Option<u64>,
    },
}
