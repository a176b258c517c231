//! Built-in role implementations and the role factory
//!
//! Role ids from the configuration document resolve to concrete
//! implementations through the explicit factory match in [`build_role`] —
//! never through runtime type-name parsing. The built-ins are deterministic
//! by construction so the engine can be exercised end to end without any
//! model dependency.

pub mod echo;
pub mod responder;
pub mod summarizer;

pub use echo::EchoRole;
pub use responder::ResponderRole;
pub use summarizer::SummarizerRole;

use crate::config::{RoleEntry, RolesConfig};
use crate::registry::RoleRegistry;
use sdk::errors::EngineError;
use sdk::BotRole;
use std::sync::Arc;
use tracing::info;

/// Resolve a configuration entry to a concrete role implementation
///
/// An unknown `implementation_ref` is a fatal configuration error.
pub fn build_role(entry: &RoleEntry) -> Result<Arc<dyn BotRole>, EngineError> {
    match entry.implementation_ref.as_str() {
        "builtin.echo" => Ok(Arc::new(EchoRole::new(&entry.id))),
        "builtin.summarizer" => Ok(Arc::new(SummarizerRole::new(&entry.id))),
        "builtin.responder" => Ok(Arc::new(ResponderRole::new(&entry.id))),
        other => Err(EngineError::UnknownImplementation(other.to_string())),
    }
}

/// Build and register every enabled role from the configuration document
///
/// Registration follows array order, which fixes the priority tie-break
/// order for the lifetime of the registry.
pub async fn register_from_config(
    registry: &RoleRegistry,
    config: &RolesConfig,
) -> Result<(), EngineError> {
    for entry in config.enabled_roles() {
        let role = build_role(entry)?;
        registry.register(role, Some(&entry.configuration)).await?;
    }

    info!("Registered {} roles from configuration", registry.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::role::RoleConfig;

    fn entry(id: &str, implementation_ref: &str) -> RoleEntry {
        RoleEntry {
            id: id.to_string(),
            implementation_ref: implementation_ref.to_string(),
            enabled: true,
            configuration: RoleConfig::new(),
        }
    }

    #[test]
    fn test_factory_resolves_builtins() {
        assert_eq!(build_role(&entry("e", "builtin.echo")).unwrap().id(), "e");
        assert_eq!(
            build_role(&entry("s", "builtin.summarizer")).unwrap().id(),
            "s"
        );
        assert_eq!(
            build_role(&entry("r", "builtin.responder")).unwrap().id(),
            "r"
        );
    }

    #[test]
    fn test_factory_rejects_unknown_implementation() {
        assert!(matches!(
            build_role(&entry("x", "builtin.telepath")),
            Err(EngineError::UnknownImplementation(r)) if r == "builtin.telepath"
        ));
    }

    #[tokio::test]
    async fn test_register_from_default_config() {
        let registry = RoleRegistry::new();
        let config = RolesConfig::default_config();

        register_from_config(&registry, &config).await.unwrap();

        assert_eq!(registry.len(), 3);
        assert!(registry.get("echo").is_some());
        assert!(registry.get("summarizer").is_some());
        assert!(registry.get("responder").is_some());
    }

    #[tokio::test]
    async fn test_disabled_roles_are_skipped() {
        let registry = RoleRegistry::new();
        let mut config = RolesConfig::default_config();
        config.roles[2].enabled = false; // echo

        register_from_config(&registry, &config).await.unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.get("echo").is_none());
    }
}
