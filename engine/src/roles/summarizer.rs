//! Summarizer role
//!
//! Deterministic extractive stub: keeps the first `max_sentences` sentences
//! of the input, then optionally clamps to `max_chars`. Records input and
//! summary sizes in response metadata.

use async_trait::async_trait;
use sdk::role::{RoleConfig, RoleError, DEFAULT_PRIORITY};
use sdk::{BotRole, RoleContext, RoleResponse};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::debug;

struct SummarizerSettings {
    max_sentences: usize,
    max_chars: Option<usize>,
    priority: i32,
}

/// Role that produces an extractive summary of its input
pub struct SummarizerRole {
    id: String,
    tags: Vec<String>,
    settings: RwLock<SummarizerSettings>,
    initialized: AtomicBool,
}

impl SummarizerRole {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            tags: vec!["summarize".to_string(), "text".to_string()],
            settings: RwLock::new(SummarizerSettings {
                max_sentences: 3,
                max_chars: None,
                priority: DEFAULT_PRIORITY,
            }),
            initialized: AtomicBool::new(false),
        }
    }
}

/// Take the first `max_sentences` sentences, keeping their terminators
fn leading_sentences(text: &str, max_sentences: usize) -> String {
    let mut out = String::new();
    let mut count = 0;

    for ch in text.chars() {
        out.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            count += 1;
            if count >= max_sentences {
                break;
            }
        }
    }

    out.trim().to_string()
}

/// Clamp to at most `max_chars` characters (not bytes)
fn clamp_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

#[async_trait]
impl BotRole for SummarizerRole {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        "Summarizer"
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn priority(&self) -> i32 {
        self.settings
            .read()
            .expect("SummarizerRole lock poisoned")
            .priority
    }

    fn can_handle(&self, context: &RoleContext) -> bool {
        !context.input.trim().is_empty()
    }

    async fn initialize(&self, config: &RoleConfig) -> Result<(), RoleError> {
        if self.initialized.load(Ordering::SeqCst) {
            debug!("Role '{}' already initialized, ignoring", self.id);
            return Ok(());
        }

        let max_sentences = match config.get("max_sentences") {
            None => 3,
            Some(v) => v
                .as_u64()
                .filter(|&n| n > 0)
                .map(|n| n as usize)
                .ok_or_else(|| {
                    RoleError::InvalidConfig("max_sentences must be a positive integer".to_string())
                })?,
        };

        let max_chars = match config.get("max_chars") {
            None => None,
            Some(v) => Some(v.as_u64().filter(|&n| n > 0).map(|n| n as usize).ok_or_else(
                || RoleError::InvalidConfig("max_chars must be a positive integer".to_string()),
            )?),
        };

        let priority = match config.get("priority") {
            None => DEFAULT_PRIORITY,
            Some(v) => v
                .as_i64()
                .map(|p| p as i32)
                .ok_or_else(|| RoleError::InvalidConfig("priority must be an integer".to_string()))?,
        };

        {
            let mut settings = self
                .settings
                .write()
                .expect("SummarizerRole lock poisoned");
            settings.max_sentences = max_sentences;
            settings.max_chars = max_chars;
            settings.priority = priority;
        }

        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn execute(&self, context: &RoleContext) -> Result<RoleResponse, RoleError> {
        let (max_sentences, max_chars) = {
            let settings = self.settings.read().expect("SummarizerRole lock poisoned");
            (settings.max_sentences, settings.max_chars)
        };

        let mut summary = leading_sentences(&context.input, max_sentences);
        if let Some(max_chars) = max_chars {
            summary = clamp_chars(&summary, max_chars);
        }

        let input_chars = context.input.chars().count();
        let summary_chars = summary.chars().count();

        Ok(RoleResponse::complete(summary)
            .with_metadata("input_chars", json!(input_chars))
            .with_metadata("summary_chars", json!(summary_chars)))
    }
}
