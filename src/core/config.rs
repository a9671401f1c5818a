//! Configuration management for agentflow
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/agentflow/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::error::{FlowError, Result};

/// Main configuration for agentflow
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Session identity defaults
    pub session: SessionConfig,
    /// Engine limits and timeouts
    pub runner: RunnerConfig,
    /// Session storage backend
    #[serde(default)]
    pub storage: StorageConfig,
    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default identity for sessions created by the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Application name stamped on new sessions
    pub app_name: String,
    /// User id used when none is given
    pub user_id: String,
}

/// Limits applied while a workflow runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Events buffered ahead of the consumer
    /// Default: 1
    pub event_buffer: usize,
    /// Decisions an agent may take within one turn
    /// Default: 10
    pub max_steps: usize,
    /// Agent-to-agent transfers allowed per node
    /// Default: 5
    pub max_transfers: usize,
    /// Default timeout for a model decision
    pub decision_timeout_secs: Option<u64>,
    /// Default timeout for a tool call
    pub tool_timeout_secs: Option<u64>,
}

/// Where sessions are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
}

/// Session storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for the file backend
    pub dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive (e.g. `info`, `agentflow=debug`)
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Whether to show debug output
    pub debug: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            app_name: env::var("AGENTFLOW_APP").unwrap_or_else(|_| "agentflow".to_string()),
            user_id: env::var("AGENTFLOW_USER").unwrap_or_else(|_| "user".to_string()),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            event_buffer: 1,
            max_steps: 10,
            max_transfers: 5,
            decision_timeout_secs: env::var("AGENTFLOW_DECISION_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok()),
            tool_timeout_secs: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: match env::var("AGENTFLOW_STORAGE").as_deref() {
                Ok("file") => StorageBackend::File,
                _ => StorageBackend::Memory,
            },
            dir: Config::config_dir().join("sessions"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: env::var("AGENTFLOW_LOG").unwrap_or_else(|_| "warn".to_string()),
            json: false,
            debug: env::var("AGENTFLOW_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

impl RunnerConfig {
    pub fn decision_timeout(&self) -> Option<Duration> {
        self.decision_timeout_secs.map(Duration::from_secs)
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("agentflow")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > config file > env vars > defaults
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();

        if let Ok(config) = Self::load_from_file() {
            return config;
        }

        Self::default()
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(FlowError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| FlowError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| FlowError::config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file and return the path
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| FlowError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| FlowError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| FlowError::config(format!("Failed to write config: {}", e)))?;

        Ok(config_path)
    }

    /// Generate a default config file content for display
    pub fn default_config_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}
