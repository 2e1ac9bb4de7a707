//! Configuration loading, validation, and management for Ragraph.
//!
//! Loads configuration from `~/.ragraph/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.ragraph/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Embedding model used by the embedding retriever
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Providers tried, in order, after the default one fails
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_chain: Vec<String>,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Orchestration settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Topic gate settings
    #[serde(default)]
    pub topic: TopicConfig,

    /// Conversation memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Passage corpus and retrieval configuration
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.0
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
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
            .field("embedding_model", &self.embedding_model)
            .field("fallback_chain", &self.fallback_chain)
            .field("providers", &self.providers)
            .field("pipeline", &self.pipeline)
            .field("topic", &self.topic)
            .field("memory", &self.memory)
            .field("knowledge", &self.knowledge)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
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

    /// Per-request timeout when used in the fallback chain
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

fn default_provider_timeout() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: None,
            default_model: None,
            timeout_secs: default_provider_timeout(),
        }
    }
}

/// Bounds and knobs of the orchestration graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Refinement (tweak → retrieve) cycles allowed per invocation
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Passages requested from the retriever per cycle
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Deadline for one whole invocation
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Relevance judgments allowed in flight at once
    #[serde(default = "default_evaluate_concurrency")]
    pub evaluate_concurrency: usize,

    /// Characters of each passage shown to the relevance grader
    #[serde(default = "default_grading_excerpt_chars")]
    pub grading_excerpt_chars: usize,
}

fn default_max_attempts() -> u32 {
    2
}
fn default_top_k() -> usize {
    2
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_evaluate_concurrency() -> usize {
    4
}
fn default_grading_excerpt_chars() -> usize {
    2000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            top_k: default_top_k(),
            timeout_secs: default_timeout_secs(),
            evaluate_concurrency: default_evaluate_concurrency(),
            grading_excerpt_chars: default_grading_excerpt_chars(),
        }
    }
}

/// What the topic gate considers in scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Free-text description handed to the classifier
    #[serde(default = "default_topic_description")]
    pub description: String,
}

fn default_topic_description() -> String {
    "1. Information about the owner of Bella Vista, which is Antonio Rossi.\n\
     2. Prices of dishes at Bella Vista (restaurant).\n\
     3. Opening hours of Bella Vista (restaurant)."
        .into()
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            description: default_topic_description(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// "in_memory", "file" or "sqlite"
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// Directory (file backend) or database file (sqlite backend).
    /// Defaults to a location under the config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_memory_backend() -> String {
    "file".into()
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
pub struct KnowledgeConfig {
    /// Passage corpus (JSON array or JSONL). None = bundled sample corpus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corpus_path: Option<String>,

    /// "keyword" or "embedding"
    #[serde(default = "default_retriever")]
    pub retriever: String,
}

fn default_retriever() -> String {
    "keyword".into()
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            corpus_path: None,
            retriever: default_retriever(),
        }
    }
}

const MEMORY_BACKENDS: &[&str] = &["in_memory", "file", "sqlite"];
const RETRIEVERS: &[&str] = &["keyword", "embedding"];

impl AppConfig {
    /// Load configuration from the default path (~/.ragraph/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `RAGRAPH_API_KEY` (highest priority)
    /// - `OPENAI_API_KEY`
    /// - `OPENROUTER_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("RAGRAPH_API_KEY")
                .or_else(|| lookup("OPENAI_API_KEY"))
                .or_else(|| lookup("OPENROUTER_API_KEY"));
        }

        if let Some(provider) = lookup("RAGRAPH_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("RAGRAPH_MODEL") {
            self.default_model = model;
        }
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

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ragraph")
    }

    /// Directory for the file memory backend unless overridden.
    pub fn default_conversations_dir() -> PathBuf {
        Self::config_dir().join("conversations")
    }

    /// Database file for the sqlite memory backend unless overridden.
    pub fn default_sqlite_path() -> PathBuf {
        Self::config_dir().join("conversations.sqlite")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.pipeline.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.top_k must be at least 1".into(),
            ));
        }

        if self.pipeline.evaluate_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.evaluate_concurrency must be at least 1".into(),
            ));
        }

        if self.pipeline.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.timeout_secs must be at least 1".into(),
            ));
        }

        if self.topic.description.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "topic.description must not be empty".into(),
            ));
        }

        if !MEMORY_BACKENDS.contains(&self.memory.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "memory.backend must be one of {MEMORY_BACKENDS:?}, got '{}'",
                self.memory.backend
            )));
        }

        if !RETRIEVERS.contains(&self.knowledge.retriever.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "knowledge.retriever must be one of {RETRIEVERS:?}, got '{}'",
                self.knowledge.retriever
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
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
            embedding_model: default_embedding_model(),
            fallback_chain: Vec::new(),
            providers: HashMap::new(),
            pipeline: PipelineConfig::default(),
            topic: TopicConfig::default(),
            memory: MemoryConfig::default(),
            knowledge: KnowledgeConfig::default(),
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
