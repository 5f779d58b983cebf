//! Configuration loading, validation, and management for Curator.
//!
//! Loads configuration from `~/.curator/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.curator/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Oracle backend settings
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Decision memory settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Dispatch loop settings
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Content collaborators
    #[serde(default)]
    pub content: ContentConfig,

    /// Persona overrides
    #[serde(default)]
    pub persona: PersonaConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Backend kind: "ollama"
    #[serde(default = "default_oracle_backend")]
    pub backend: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per decision on transport failure
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_oracle_backend() -> String {
    "ollama".into()
}
fn default_api_url() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "gemma3".into()
}
fn default_timeout_secs() -> u64 {
    180
}
fn default_max_attempts() -> u32 {
    3
}

impl OracleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            backend: default_oracle_backend(),
            api_url: default_api_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Backend: "sqlite", "memory"
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// Database path; defaults to `~/.curator/memory.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_memory_backend() -> String {
    "sqlite".into()
}

impl MemoryConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| AppConfig::config_dir().join("memory.db"))
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Delay after each recorded iteration
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,

    /// Optional hard cap on iterations per loop. Unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
}

fn default_throttle_ms() -> u64 {
    1000
}

impl DispatchConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            throttle_ms: default_throttle_ms(),
            max_iterations: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// JSON snapshot backing the content store and analytics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<String>,

    /// Site ids advertised to the main persona
    #[serde(default = "default_site_ids")]
    pub site_ids: Vec<u32>,
}

fn default_site_ids() -> Vec<u32> {
    vec![1, 2, 3]
}

impl ContentConfig {
    pub fn resolved_snapshot_path(&self) -> PathBuf {
        self.snapshot_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| AppConfig::config_dir().join("content.json"))
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            site_ids: default_site_ids(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Markdown file appended to every persona
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_format() -> String {
    "pretty".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.curator/config.toml).
    ///
    /// Environment overrides:
    /// - `CURATOR_ORACLE_URL`
    /// - `CURATOR_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific file path, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

            toml::from_str::<Self>(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        } else {
            tracing::info!("No config file found at {}, using defaults", path.display());
            Self::default()
        };

        if let Ok(url) = std::env::var("CURATOR_ORACLE_URL") {
            config.oracle.api_url = url;
        }
        if let Ok(model) = std::env::var("CURATOR_MODEL") {
            config.oracle.model = model;
        }

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".curator")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.oracle.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "oracle.timeout_secs must be > 0".into(),
            ));
        }

        if self.oracle.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "oracle.max_attempts must be >= 1".into(),
            ));
        }

        if !matches!(self.memory.backend.as_str(), "sqlite" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "unknown memory.backend '{}'",
                self.memory.backend
            )));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(format!(
                "unknown logging.format '{}'",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            oracle: OracleConfig::default(),
            memory: MemoryConfig::default(),
            dispatch: DispatchConfig::default(),
            content: ContentConfig::default(),
            persona: PersonaConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
