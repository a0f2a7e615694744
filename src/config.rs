//! Configuration management for duck-console.
//!
//! Handles loading configuration from a TOML file and environment variables.
//! Precedence is command line, then environment, then file, then defaults;
//! the binary applies the command-line layer on top of what is loaded here.

use crate::error::{ConsoleError, Result};
use crate::llm::LlmProvider;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Database file used when neither the config nor `DUCKDB_PATH` names one.
pub const DEFAULT_DATABASE_PATH: &str = "../duckdb-demo.duckdb";

/// Main configuration structure for duck-console.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Database file settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Translator settings.
    #[serde(default)]
    pub llm: LlmConfig,
}

/// Database file configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Path to the database file.
    pub path: Option<PathBuf>,

    /// Open the file read-only.
    #[serde(default = "default_read_only")]
    pub read_only: bool,
}

fn default_read_only() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            read_only: default_read_only(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted database upload, in megabytes.
    #[serde(default = "default_upload_limit_mb")]
    pub upload_limit_mb: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_upload_limit_mb() -> usize {
    512
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upload_limit_mb: default_upload_limit_mb(),
        }
    }
}

impl ServerConfig {
    /// Address string for binding, e.g. `127.0.0.1:5001`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Upload limit in bytes.
    pub fn upload_limit_bytes(&self) -> usize {
        self.upload_limit_mb.saturating_mul(1024 * 1024)
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    /// LLM provider: "openai" or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name (e.g., "gpt-3.5-turbo", "gpt-4o").
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// API key, read from `OPENAI_API_KEY` only.
    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    500
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
        }
    }
}

impl LlmConfig {
    /// Parses the configured provider name.
    pub fn provider(&self) -> Result<LlmProvider> {
        self.provider.parse().map_err(ConsoleError::config)
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("duck-console")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConsoleError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            ConsoleError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;
        config.llm.provider()?;
        Ok(config)
    }

    /// Applies process environment variables on top of the file values.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Applies variables from `lookup`, ignoring empty values.
    ///
    /// Recognized: `DUCKDB_PATH`, `OPENAI_API_KEY`, `OPENAI_MODEL`, `DUCK_CONSOLE_LLM`.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = var("DUCKDB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(key) = var("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = var("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(provider) = var("DUCK_CONSOLE_LLM") {
            self.llm.provider = provider;
        }
    }

    /// Database file to open at startup.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH))
    }
}
