//! Configuration loading, validation, and management for NeuroCite.
//!
//! Loads configuration from `~/.neurocite/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.neurocite/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default model provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model used for hop reasoning and answer synthesis
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Temperature for reasoning and synthesis
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Multi-hop loop limits and thresholds
    #[serde(default)]
    pub agent: AgentSettings,

    /// Query expansion settings
    #[serde(default)]
    pub expansion: ExpansionConfig,

    /// Literature retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Structured (compound potency) store settings
    #[serde(default)]
    pub warehouse: WarehouseConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    2048
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
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("agent", &self.agent)
            .field("expansion", &self.expansion)
            .field("retrieval", &self.retrieval)
            .field("warehouse", &self.warehouse)
            .field("gateway", &self.gateway)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Limits for the multi-hop loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Maximum tool invocations per question
    #[serde(default = "default_max_hops")]
    pub max_hops: u32,

    /// Number of reformulations requested from the expander
    #[serde(default = "default_expansions")]
    pub expansions: usize,

    /// Nearest neighbours fetched per literature search
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Distance at or below which evidence counts as relevant (smaller is better)
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Wall-clock budget for the hop loop
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Extra attempts for a tool whose backend is temporarily unavailable
    #[serde(default = "default_tool_retries")]
    pub tool_retries: u32,

    /// Longest excerpt kept per retrieved document
    #[serde(default = "default_max_snippet_chars")]
    pub max_snippet_chars: usize,
}

fn default_max_hops() -> u32 {
    5
}
fn default_expansions() -> usize {
    3
}
fn default_top_k() -> usize {
    5
}
fn default_confidence_threshold() -> f32 {
    1.2
}
fn default_request_timeout() -> u64 {
    60
}
fn default_tool_retries() -> u32 {
    1
}
fn default_max_snippet_chars() -> usize {
    15_000
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_hops: default_max_hops(),
            expansions: default_expansions(),
            top_k: default_top_k(),
            confidence_threshold: default_confidence_threshold(),
            request_timeout_secs: default_request_timeout(),
            tool_retries: default_tool_retries(),
            max_snippet_chars: default_max_snippet_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpansionConfig {
    /// Model used for reformulation (falls back to `default_model`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default = "default_expansion_temperature")]
    pub temperature: f32,
}

fn default_expansion_temperature() -> f32 {
    0.2
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            model: None,
            temperature: default_expansion_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// JSON-lines corpus of `{pmid, title, text, embedding}` records
    #[serde(default = "default_corpus_path")]
    pub corpus_path: String,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_corpus_path() -> String {
    AppConfig::config_dir()
        .join("corpus.jsonl")
        .to_string_lossy()
        .into_owned()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            embedding_model: default_embedding_model(),
            corpus_path: default_corpus_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// SQLite database holding the `compounds` table
    #[serde(default = "default_warehouse_path")]
    pub sqlite_path: String,

    /// Maximum records returned per structured lookup
    #[serde(default = "default_lookup_limit")]
    pub lookup_limit: usize,
}

fn default_warehouse_path() -> String {
    AppConfig::config_dir()
        .join("compounds.db")
        .to_string_lossy()
        .into_owned()
}
fn default_lookup_limit() -> usize {
    10
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_warehouse_path(),
            lookup_limit: default_lookup_limit(),
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
    5000
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

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.neurocite/config.toml).
    ///
    /// Also checks environment variables:
    /// - `NEUROCITE_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `NEUROCITE_PROVIDER`
    /// - `NEUROCITE_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
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

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = var("NEUROCITE_API_KEY").or_else(|| var("OPENAI_API_KEY"));
        }
        if let Some(provider) = var("NEUROCITE_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = var("NEUROCITE_MODEL") {
            self.default_model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".neurocite")
    }

    /// Model used for query expansion.
    pub fn expansion_model(&self) -> &str {
        self.expansion.model.as_deref().unwrap_or(&self.default_model)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.agent.max_hops == 0 {
            return Err(ConfigError::ValidationError("agent.max_hops must be at least 1".into()));
        }
        if self.agent.expansions == 0 {
            return Err(ConfigError::ValidationError("agent.expansions must be at least 1".into()));
        }
        if self.agent.top_k == 0 {
            return Err(ConfigError::ValidationError("agent.top_k must be at least 1".into()));
        }
        if !self.agent.confidence_threshold.is_finite() || self.agent.confidence_threshold < 0.0 {
            return Err(ConfigError::ValidationError(
                "agent.confidence_threshold must be a non-negative number".into(),
            ));
        }
        if self.agent.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent.request_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            agent: AgentSettings::default(),
            expansion: ExpansionConfig::default(),
            retrieval: RetrievalConfig::default(),
            warehouse: WarehouseConfig::default(),
            gateway: GatewayConfig::default(),
            providers: HashMap::new(),
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
