//! Configuration management for DevCrew.
//!
//! Handles loading configuration from TOML files and environment variables.
//! Precedence, highest first: CLI flags (applied by the caller), environment,
//! config file, built-in defaults.

use crate::db::{
    DatabaseRef, ReadLimits, DEFAULT_DATABASE_NAME, DEFAULT_MAX_ROWS, DEFAULT_QUERY_TIMEOUT_SECS,
};
use crate::error::{CrewError, Result};
use crate::llm::LlmProvider;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Main configuration structure for DevCrew.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM provider configuration.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider: "openai" or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name (e.g., "gpt-4o-mini").
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of an OpenAI-compatible API.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of tool-calling rounds per task.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,

    /// API key, only ever read from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_tool_rounds() -> usize {
    8
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
            max_tool_rounds: default_max_tool_rounds(),
            api_key: None,
        }
    }
}

impl LlmConfig {
    /// Parses the configured provider.
    pub fn provider(&self) -> Result<LlmProvider> {
        self.provider.parse().map_err(CrewError::config)
    }
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database used until a session selects another one.
    #[serde(default = "default_database_name")]
    pub default_name: String,

    /// Directory relative database names are resolved against.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Rows a read returns before the result is truncated.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    /// Read timeout in seconds.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_database_name() -> String {
    DEFAULT_DATABASE_NAME.to_string()
}

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_rows() -> usize {
    DEFAULT_MAX_ROWS
}

fn default_query_timeout_secs() -> u64 {
    DEFAULT_QUERY_TIMEOUT_SECS
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            default_name: default_database_name(),
            directory: default_directory(),
            max_rows: default_max_rows(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

impl DatabaseConfig {
    /// Returns the normalized default database.
    pub fn default_database(&self) -> Result<DatabaseRef> {
        DatabaseRef::new(&self.default_name)
            .map_err(|_| CrewError::config("database.default_name must not be empty"))
    }

    /// Returns the limits applied to reads.
    pub fn read_limits(&self) -> ReadLimits {
        ReadLimits {
            max_rows: self.max_rows,
            timeout: Duration::from_secs(self.query_timeout_secs),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("devcrew")
            .join("config.toml")
    }

    /// Loads the config file, applies environment overrides and validates.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| CrewError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            CrewError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies environment overrides, reading variables through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(base_url) = lookup("OPENAI_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }
        if let Some(provider) = lookup("DEVCREW_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Some(name) = lookup("DEVCREW_DATABASE") {
            self.database.default_name = name;
        }
        if let Some(dir) = lookup("DEVCREW_DATA_DIR") {
            self.database.directory = PathBuf::from(dir);
        }
    }

    /// Checks values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        self.llm.provider()?;

        if let Some(base_url) = &self.llm.base_url {
            let url = Url::parse(base_url)
                .map_err(|e| CrewError::config(format!("Invalid llm.base_url '{base_url}': {e}")))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(CrewError::config(format!(
                    "Invalid scheme '{}' in llm.base_url. Expected 'http' or 'https'",
                    url.scheme()
                )));
            }
        }

        if self.llm.max_tool_rounds == 0 {
            return Err(CrewError::config("llm.max_tool_rounds must be at least 1"));
        }

        if self.database.max_rows == 0 {
            return Err(CrewError::config("database.max_rows must be at least 1"));
        }
        if self.database.query_timeout_secs == 0 {
            return Err(CrewError::config(
                "database.query_timeout_secs must be at least 1",
            ));
        }

        self.database.default_database()?;
        Ok(())
    }
}
