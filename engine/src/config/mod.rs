//! Configuration management
//!
//! This module handles loading, validation, and management of the Troupe role
//! configuration. The configuration is a JSON document stored at
//! ~/.troupe/roles.json.
//!
//! # Document Layout
//!
//! - **roles**: an array of role records `{ id, implementation_ref, enabled,
//!   configuration }`. Array order defines registration order, which is also
//!   the tie-break order for equal-priority roles.
//! - **settings**: global engine settings (default execution mode,
//!   concurrency bound, state persistence, cleanup interval).
//!
//! # Path Expansion
//!
//! Paths in the settings section support ~ expansion to the user's home
//! directory, resolved at load time.
//!
//! # Examples
//!
//! ```no_run
//! use troupe_engine::config::RolesConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration from the default location
//! let config = RolesConfig::load_or_create()?;
//! println!("Default mode: {}", config.settings.default_execution_mode);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use sdk::role::RoleConfig;
use sdk::ExecutionMode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Main role configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolesConfig {
    /// Role records in registration order
    pub roles: Vec<RoleEntry>,

    /// Global engine settings
    #[serde(default)]
    pub settings: Settings,
}

/// One role record in the configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleEntry {
    /// Stable role id, unique within the document
    pub id: String,

    /// Reference to a concrete implementation in the role factory
    pub implementation_ref: String,

    /// Disabled roles are skipped at registration
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Per-role behavior configuration, passed through unexamined
    #[serde(default)]
    pub configuration: RoleConfig,
}

/// Global engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Upper bound on simultaneous role executions in Parallel mode
    #[serde(default = "default_max_concurrent_roles")]
    pub max_concurrent_roles: usize,

    /// Execution mode used when a call doesn't specify one
    #[serde(default)]
    pub default_execution_mode: ExecutionMode,

    /// Persist conversation state to the state database
    #[serde(default = "default_true")]
    pub enable_state_persistence: bool,

    /// Per-step wall-clock bound in seconds
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: u64,

    /// Conversations idle longer than this are eligible for cleanup
    #[serde(default = "default_cleanup_interval_hours")]
    pub cleanup_interval_hours: u64,

    /// State database path (supports ~ expansion)
    #[serde(default = "default_state_db_path")]
    pub state_db_path: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_max_concurrent_roles() -> usize {
    4
}

fn default_response_timeout_secs() -> u64 {
    30
}

fn default_cleanup_interval_hours() -> u64 {
    720
}

fn default_state_db_path() -> PathBuf {
    PathBuf::from("~/.troupe/state.db")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_concurrent_roles: default_max_concurrent_roles(),
            default_execution_mode: ExecutionMode::default(),
            enable_state_persistence: true,
            response_timeout_secs: default_response_timeout_secs(),
            cleanup_interval_hours: default_cleanup_interval_hours(),
            state_db_path: default_state_db_path(),
            log_level: default_log_level(),
        }
    }
}

impl RolesConfig {
    /// Load configuration from the default location (~/.troupe/roles.json)
    ///
    /// If the configuration file doesn't exist, creates a default
    /// configuration with the built-in roles and saves it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the configuration file cannot be read
    /// - JSON parsing fails
    /// - validation fails (duplicate ids, empty ids, invalid log level)
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            tracing::info!(
                "No role configuration found, creating defaults at {}",
                config_path.display()
            );
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: RolesConfig = serde_json::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save it to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default_config();
        config.validate_and_process()?;

        let json_string = serde_json::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, json_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.troupe/roles.json)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".troupe").join("roles.json"))
    }

    /// Create a default configuration with the built-in roles
    pub fn default_config() -> Self {
        Self {
            roles: vec![
                RoleEntry {
                    id: "responder".to_string(),
                    implementation_ref: "builtin.responder".to_string(),
                    enabled: true,
                    configuration: RoleConfig::from([(
                        "template".to_string(),
                        json!("You said: {input}"),
                    )]),
                },
                RoleEntry {
                    id: "summarizer".to_string(),
                    implementation_ref: "builtin.summarizer".to_string(),
                    enabled: true,
                    configuration: RoleConfig::from([(
                        "max_sentences".to_string(),
                        json!(3),
                    )]),
                },
                RoleEntry {
                    id: "echo".to_string(),
                    implementation_ref: "builtin.echo".to_string(),
                    enabled: true,
                    configuration: RoleConfig::new(),
                },
            ],
            settings: Settings::default(),
        }
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - rejects empty or duplicate role ids
    /// - validates the log level
    /// - expands ~ in the state database path
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let mut seen = HashSet::new();
        for entry in &self.roles {
            if entry.id.trim().is_empty() {
                return Err(EngineError::Config(
                    "Role entries must have a non-empty id".to_string(),
                ));
            }
            if entry.implementation_ref.trim().is_empty() {
                return Err(EngineError::Config(format!(
                    "Role '{}' has an empty implementation_ref",
                    entry.id
                )));
            }
            if !seen.insert(entry.id.clone()) {
                return Err(EngineError::DuplicateRoleId(entry.id.clone()));
            }
        }

        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.settings.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.settings.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.settings.max_concurrent_roles == 0 {
            return Err(EngineError::Config(
                "max_concurrent_roles must be at least 1".to_string(),
            ));
        }

        self.settings.state_db_path = expand_path(&self.settings.state_db_path)?;

        Ok(())
    }

    /// Role entries that are enabled, in registration order
    pub fn enabled_roles(&self) -> impl Iterator<Item = &RoleEntry> {
        self.roles.iter().filter(|r| r.enabled)
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
