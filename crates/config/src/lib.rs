//! Configuration loading, validation, and management for threadclaw.
//!
//! Loads configuration from `~/.threadclaw/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.threadclaw/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model backend connection settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Thread store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Run defaults
    #[serde(default)]
    pub agent: AgentDefaults,

    /// Named agent profiles
    #[serde(default = "default_agents")]
    pub agents: HashMap<String, AgentProfileConfig>,
}

/// Connection settings for the chat backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of an OpenAI-compatible endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key; usually supplied via environment instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default model
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
        }
    }
}

/// Thread store selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "memory" or "file"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// Data directory for the file store; defaults to the config dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_store_backend() -> String {
    "file".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    41414
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Defaults applied to every run unless the profile overrides them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefaults {
    /// Iteration budget per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Profile used when the caller names none
    #[serde(default = "default_agent_name")]
    pub default_agent: String,

    /// Route continuations through the work queue
    #[serde(default)]
    pub detached: bool,
}

fn default_max_iterations() -> u32 {
    5
}
fn default_agent_name() -> String {
    "assistant".into()
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            default_agent: default_agent_name(),
            detached: false,
        }
    }
}

/// A named agent profile: prompt, enabled tools, and budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfileConfig {
    /// System prompt seeded into new threads
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Model override for this profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Tools this profile may call; empty disables tool use
    #[serde(default)]
    pub tools: Vec<String>,

    /// Iteration budget override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
}

fn default_system_prompt() -> String {
    "You are a helpful assistant.".into()
}

impl Default for AgentProfileConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            model: None,
            tools: vec![],
            max_iterations: None,
        }
    }
}

/// The built-in profile, available even when the config file defines others.
fn default_assistant_profile() -> AgentProfileConfig {
    AgentProfileConfig {
        tools: vec!["calculator".into(), "clock".into(), "lookup".into()],
        ..AgentProfileConfig::default()
    }
}

fn default_agents() -> HashMap<String, AgentProfileConfig> {
    let mut agents = HashMap::new();
    agents.insert("assistant".to_string(), default_assistant_profile());
    agents
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("backend", &self.backend)
            .field("store", &self.store)
            .field("gateway", &self.gateway)
            .field("agent", &self.agent)
            .field("agents", &self.agents.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.threadclaw/config.toml),
    /// or from `$THREADCLAW_CONFIG` when set.
    ///
    /// Also checks environment variables:
    /// - `THREADCLAW_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `THREADCLAW_BASE_URL`
    /// - `THREADCLAW_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("THREADCLAW_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"));
        let mut config = Self::load_from(&config_path)?;

        // Environment variable overrides (highest priority)
        if config.backend.api_key.is_none() {
            config.backend.api_key = std::env::var("THREADCLAW_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(base_url) = std::env::var("THREADCLAW_BASE_URL") {
            config.backend.base_url = base_url;
        }

        if let Ok(model) = std::env::var("THREADCLAW_MODEL") {
            config.backend.model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // A file that defines its own [agents.*] tables replaces the map;
        // keep the built-in profile reachable unless explicitly redefined.
        config
            .agents
            .entry(default_agent_name())
            .or_insert_with(default_assistant_profile);

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".threadclaw")
    }

    /// Directory the file store writes thread documents into.
    pub fn store_dir(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("threads"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "backend.base_url must not be empty".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        match self.store.backend.as_str() {
            "memory" | "file" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "store.backend must be \"memory\" or \"file\", got \"{other}\""
                )));
            }
        }

        if !self.agents.contains_key(&self.agent.default_agent) {
            return Err(ConfigError::ValidationError(format!(
                "agent.default_agent \"{}\" has no [agents.{}] profile",
                self.agent.default_agent, self.agent.default_agent
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.backend.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            store: StoreConfig::default(),
            gateway: GatewayConfig::default(),
            agent: AgentDefaults::default(),
            agents: default_agents(),
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
