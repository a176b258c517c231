//! Responder role
//!
//! Template responder: renders a configured template with an `{input}`
//! placeholder, clamps to `max_length`, and tracks the conversation turn
//! count in the state delta. A `forward_to` configuration list populates
//! `next_roles` for pipeline chaining.

use async_trait::async_trait;
use sdk::role::{RoleConfig, RoleError, DEFAULT_PRIORITY};
use sdk::{BotRole, RoleContext, RoleResponse};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::debug;

struct ResponderSettings {
    template: String,
    max_length: Option<usize>,
    forward_to: Vec<String>,
    priority: i32,
}

/// Role that renders a response template around the input
pub struct ResponderRole {
    id: String,
    tags: Vec<String>,
    settings: RwLock<ResponderSettings>,
    initialized: AtomicBool,
}

impl ResponderRole {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            tags: vec!["respond".to_string(), "text".to_string()],
            settings: RwLock::new(ResponderSettings {
                template: "{input}".to_string(),
                max_length: None,
                forward_to: Vec::new(),
                priority: DEFAULT_PRIORITY,
            }),
            initialized: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl BotRole for ResponderRole {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        "Responder"
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn priority(&self) -> i32 {
        self.settings
            .read()
            .expect("ResponderRole lock poisoned")
            .priority
    }

    fn can_handle(&self, _context: &RoleContext) -> bool {
        true
    }

    async fn initialize(&self, config: &RoleConfig) -> Result<(), RoleError> {
        if self.initialized.load(Ordering::SeqCst) {
            debug!("Role '{}' already initialized, ignoring", self.id);
            return Ok(());
        }

        let template = match config.get("template") {
            None => "{input}".to_string(),
            Some(v) => v
                .as_str()
                .map(String::from)
                .ok_or_else(|| RoleError::InvalidConfig("template must be a string".to_string()))?,
        };

        let max_length = match config.get("max_length") {
            None => None,
            Some(v) => Some(v.as_u64().filter(|&n| n > 0).map(|n| n as usize).ok_or_else(
                || RoleError::InvalidConfig("max_length must be a positive integer".to_string()),
            )?),
        };

        let forward_to = match config.get("forward_to") {
            None => Vec::new(),
            Some(v) => v
                .as_array()
                .and_then(|items| {
                    items
                        .iter()
                        .map(|item| item.as_str().map(String::from))
                        .collect::<Option<Vec<String>>>()
                })
                .ok_or_else(|| {
                    RoleError::InvalidConfig("forward_to must be an array of strings".to_string())
                })?,
        };

        let priority = match config.get("priority") {
            None => DEFAULT_PRIORITY,
            Some(v) => v
                .as_i64()
                .map(|p| p as i32)
                .ok_or_else(|| RoleError::InvalidConfig("priority must be an integer".to_string()))?,
        };

        {
            let mut settings = self.settings.write().expect("ResponderRole lock poisoned");
            settings.template = template;
            settings.max_length = max_length;
            settings.forward_to = forward_to;
            settings.priority = priority;
        }

        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn execute(&self, context: &RoleContext) -> Result<RoleResponse, RoleError> {
        let (template, max_length, forward_to) = {
            let settings = self.settings.read().expect("ResponderRole lock poisoned");
            (
                settings.template.clone(),
                settings.max_length,
                settings.forward_to.clone(),
            )
        };

        let mut content = template.replace("{input}", &context.input);
        if let Some(max_length) = max_length {
            if content.chars().count() > max_length {
                content = content.chars().take(max_length).collect();
            }
        }

        let turn_count = context.state_i64("turn_count").unwrap_or(0) + 1;

        Ok(RoleResponse::complete(content)
            .with_state("turn_count", json!(turn_count))
            .with_next_roles(forward_to))
    }
}
