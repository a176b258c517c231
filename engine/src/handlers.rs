//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - process: run one orchestration and print the response
//! - roles: list registered roles
//! - state show/clear/cleanup: manage stored conversation state
//!
//! Handlers build the engine object graph (registry + state manager +
//! orchestrator) from the loaded configuration.

use anyhow::{Context, Result};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RolesConfig;
use crate::orchestrator::BotOrchestrator;
use crate::registry::RoleRegistry;
use crate::roles;
use crate::state::{SqliteStateBackend, StateManager};
use sdk::{ExecutionMode, OrchestrationConfig, RoleContext};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Build the state manager per the persistence settings
async fn build_state_manager(config: &RolesConfig) -> Result<Arc<StateManager>> {
    if config.settings.enable_state_persistence {
        let backend = SqliteStateBackend::new(&config.settings.state_db_path)
            .await
            .context("Failed to open state database")?;
        Ok(Arc::new(StateManager::new(Box::new(backend))))
    } else {
        Ok(Arc::new(StateManager::in_memory()))
    }
}

/// Build the full orchestrator graph: registry, roles, state manager
async fn build_orchestrator(config: &RolesConfig) -> Result<BotOrchestrator> {
    let registry = Arc::new(RoleRegistry::new());
    roles::register_from_config(&registry, config)
        .await
        .context("Failed to register roles from configuration")?;

    let state = build_state_manager(config).await?;
    Ok(BotOrchestrator::new(registry, state))
}

/// Options for a one-shot `process` invocation, taken from CLI flags
#[derive(Debug, Default)]
pub struct ProcessArgs {
    pub input: String,
    pub conversation: Option<String>,
    pub user: Option<String>,
    pub mode: Option<String>,
    pub roles: Vec<String>,
    pub tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub stop_on_failure: bool,
}

/// Run one orchestration and print the response
///
/// "No suitable role" is a valid outcome and still exits 0; only
/// configuration/startup failures become errors.
pub async fn handle_process(
    args: ProcessArgs,
    config: &RolesConfig,
    format: OutputFormat,
) -> Result<()> {
    let mode = match &args.mode {
        Some(raw) => raw
            .parse::<ExecutionMode>()
            .map_err(|e| anyhow::anyhow!(e))?,
        None => config.settings.default_execution_mode,
    };

    let orchestration = OrchestrationConfig {
        execution_mode: mode,
        specific_roles: args.roles,
        required_tags: args.tags,
        excluded_tags: args.exclude_tags,
        stop_on_first_failure: args.stop_on_failure,
        max_concurrency: config.settings.max_concurrent_roles,
        response_timeout_secs: config.settings.response_timeout_secs,
    };

    let orchestrator = build_orchestrator(config).await?;

    let mut context = RoleContext::new(args.input);
    if let Some(conversation) = args.conversation {
        context.conversation_id = conversation;
    }
    if let Some(user) = args.user {
        context.user_id = user;
    }

    let response = orchestrator.process(&mut context, &orchestration).await;
    orchestrator.registry().dispose_all().await;

    match format {
        OutputFormat::Json => println!("{}", response.to_json()),
        OutputFormat::Text => {
            if response.content.is_empty() {
                println!("(no content)");
            } else {
                println!("{}", response.content);
            }
            if !response.is_complete {
                println!();
                println!("[incomplete response]");
            }
        }
    }

    Ok(())
}

/// List registered roles (id, priority, tags)
pub async fn handle_roles(config: &RolesConfig, format: OutputFormat) -> Result<()> {
    let registry = Arc::new(RoleRegistry::new());
    roles::register_from_config(&registry, config)
        .await
        .context("Failed to register roles from configuration")?;

    let all = registry.all();

    match format {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = all
                .iter()
                .map(|role| {
                    json!({
                        "id": role.id(),
                        "display_name": role.display_name(),
                        "priority": role.priority(),
                        "tags": role.tags(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Text => {
            if all.is_empty() {
                println!("No roles registered.");
            }
            for role in &all {
                println!(
                    "{:<16} priority {:>3}  [{}]",
                    role.id(),
                    role.priority(),
                    role.tags().join(", ")
                );
            }
        }
    }

    registry.dispose_all().await;
    Ok(())
}

/// Print stored state for a conversation
pub async fn handle_state_show(
    conversation: &str,
    config: &RolesConfig,
    format: OutputFormat,
) -> Result<()> {
    let state = build_state_manager(config).await?;

    let mut context = RoleContext::new("").with_conversation(conversation);
    state.load(&mut context).await;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&context.state)?);
        }
        OutputFormat::Text => {
            if context.state.is_empty() {
                println!("No stored state for conversation '{}'.", conversation);
            } else {
                let mut keys: Vec<&String> = context.state.keys().collect();
                keys.sort();
                for key in keys {
                    println!("{} = {}", key, context.state[key]);
                }
            }
        }
    }

    Ok(())
}

/// Delete stored state for a conversation
pub async fn handle_state_clear(conversation: &str, config: &RolesConfig) -> Result<()> {
    let state = build_state_manager(config).await?;
    state
        .clear(conversation)
        .await
        .context("Failed to clear conversation state")?;

    println!("Cleared state for conversation '{}'.", conversation);
    Ok(())
}

/// Prune conversations idle longer than the given age
pub async fn handle_state_cleanup(
    older_than_hours: u64,
    config: &RolesConfig,
    format: OutputFormat,
) -> Result<()> {
    let state = build_state_manager(config).await?;
    let removed = state
        .cleanup_older_than(Duration::from_secs(older_than_hours * 3600))
        .await
        .context("Failed to clean up conversation state")?;

    match format {
        OutputFormat::Json => println!("{}", json!({ "removed": removed })),
        OutputFormat::Text => println!("Removed {} stale conversation(s).", removed),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RolesConfig {
        let mut config = RolesConfig::default_config();
        config.settings.enable_state_persistence = false;
        config
    }

    #[tokio::test]
    async fn test_build_orchestrator_from_defaults() {
        let orchestrator = build_orchestrator(&test_config()).await.unwrap();
        assert_eq!(orchestrator.registry().len(), 3);
    }

    #[tokio::test]
    async fn test_handle_process_runs_end_to_end() {
        let args = ProcessArgs {
            input: "hello there".to_string(),
            roles: vec!["echo".to_string()],
            ..Default::default()
        };

        handle_process(args, &test_config(), OutputFormat::Text)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_handle_process_rejects_bad_mode() {
        let args = ProcessArgs {
            input: "hi".to_string(),
            mode: Some("round-robin".to_string()),
            ..Default::default()
        };

        assert!(handle_process(args, &test_config(), OutputFormat::Text)
            .await
            .is_err());
    }
}
