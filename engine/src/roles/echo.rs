//! Echo role
//!
//! Returns the input verbatim, optionally behind a configured prefix.
//! Mostly useful for wiring checks and as the lowest-friction debug role.

use sdk::role::{RoleConfig, RoleError, DEFAULT_PRIORITY};
use sdk::{BotRole, RoleContext, RoleResponse};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::debug;

struct EchoSettings {
    prefix: String,
    priority: i32,
}

/// Role that echoes its input back
pub struct EchoRole {
    id: String,
    tags: Vec<String>,
    settings: RwLock<EchoSettings>,
    initialized: AtomicBool,
}

impl EchoRole {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            tags: vec!["echo".to_string(), "debug".to_string()],
            settings: RwLock::new(EchoSettings {
                prefix: String::new(),
                priority: DEFAULT_PRIORITY,
            }),
            initialized: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl BotRole for EchoRole {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        "Echo"
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn priority(&self) -> i32 {
        self.settings.read().expect("EchoRole lock poisoned").priority
    }

    fn can_handle(&self, _context: &RoleContext) -> bool {
        true
    }

    async fn initialize(&self, config: &RoleConfig) -> Result<(), RoleError> {
        if self.initialized.load(Ordering::SeqCst) {
            debug!("Role '{}' already initialized, ignoring", self.id);
            return Ok(());
        }

        let prefix = match config.get("prefix") {
            None => String::new(),
            Some(v) => v
                .as_str()
                .map(String::from)
                .ok_or_else(|| RoleError::InvalidConfig("prefix must be a string".to_string()))?,
        };

        let priority = match config.get("priority") {
            None => DEFAULT_PRIORITY,
            Some(v) => v
                .as_i64()
                .map(|p| p as i32)
                .ok_or_else(|| RoleError::InvalidConfig("priority must be an integer".to_string()))?,
        };

        {
            let mut settings = self.settings.write().expect("EchoRole lock poisoned");
            settings.prefix = prefix;
            settings.priority = priority;
        }

        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn execute(&self, context: &RoleContext) -> Result<RoleResponse, RoleError> {
        let prefix = {
            let settings = self.settings.read().expect("EchoRole lock poisoned");
            settings.prefix.clone()
        };

        Ok(RoleResponse::complete(format!("{}{}", prefix, context.input)))
    }
}
