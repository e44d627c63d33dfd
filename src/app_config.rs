use std::default::Default;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Engine configuration module
/// This module handles the engine configuration including loading,
/// validating and saving configuration settings.
/// Represents the engine configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Default target language code (ISO 639-1)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Provider config
    pub provider: ProviderConfig,

    /// Chunking config
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Cache config
    #[serde(default)]
    pub cache: CacheConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    DeepL,
    Mock,
}

impl ProviderKind {
    pub fn display_name(&self) -> &str {
        match self {
            Self::DeepL => "DeepL",
            Self::Mock => "Mock",
        }
    }

    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::DeepL => "deepl".to_string(),
            Self::Mock => "mock".to_string(),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "deepl" => Ok(Self::DeepL),
            "mock" => Ok(Self::Mock),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Provider type identifier
    #[serde(rename = "type", default)]
    pub kind: ProviderKind,

    /// API key
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Maximum characters accepted in a single request
    #[serde(default = "default_max_chars_per_request")]
    pub max_chars_per_request: usize,

    /// Admissions allowed per sliding one-second window
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry attempts for transient failures
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff time in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Backoff multiplier applied per attempt
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            api_key: String::new(),
            endpoint: default_endpoint(),
            max_chars_per_request: default_max_chars_per_request(),
            requests_per_second: default_requests_per_second(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// Configuration for document chunking
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Maximum chunks translated for a preview job
    #[serde(default = "default_preview_max_chunks")]
    pub preview_max_chunks: usize,

    /// Maximum characters translated for a preview job
    #[serde(default = "default_preview_max_chars")]
    pub preview_max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            preview_max_chunks: default_preview_max_chunks(),
            preview_max_chars: default_preview_max_chars(),
        }
    }
}

/// Configuration for the two-tier translation cache
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Time-to-live for volatile tier entries, in seconds
    #[serde(default = "default_volatile_ttl_secs")]
    pub volatile_ttl_secs: u64,

    /// Age after which unused durable entries become evictable, in days
    #[serde(default = "default_evict_after_days")]
    pub evict_after_days: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            volatile_ttl_secs: default_volatile_ttl_secs(),
            evict_after_days: default_evict_after_days(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_target_language() -> String {
    "en".to_string()
}

fn default_endpoint() -> String {
    "https://api-free.deepl.com/v2".to_string()
}

fn default_max_chars_per_request() -> usize {
    500_000
}

fn default_requests_per_second() -> usize {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_backoff_multiplier() -> u32 {
    2
}

fn default_max_chunk_size() -> usize {
    4000
}

fn default_preview_max_chunks() -> usize {
    3
}

fn default_preview_max_chars() -> usize {
    10_000
}

fn default_volatile_ttl_secs() -> u64 {
    3600
}

fn default_evict_after_days() -> i64 {
    90
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let config: Config =
            serde_json::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let _target_name = crate::language_utils::get_language_name(&self.target_language)?;

        if self.provider.kind == ProviderKind::DeepL && self.provider.api_key.is_empty() {
            return Err(anyhow!("Translation API key is required for DeepL provider"));
        }

        if self.provider.max_chars_per_request == 0 {
            return Err(anyhow!("max_chars_per_request must be greater than zero"));
        }

        if self.provider.requests_per_second == 0 {
            return Err(anyhow!("requests_per_second must be greater than zero"));
        }

        if self.chunking.max_chunk_size == 0 {
            return Err(anyhow!("max_chunk_size must be greater than zero"));
        }

        if self.chunking.max_chunk_size > self.provider.max_chars_per_request {
            return Err(anyhow!(
                "max_chunk_size ({}) exceeds max_chars_per_request ({})",
                self.chunking.max_chunk_size,
                self.provider.max_chars_per_request
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            target_language: default_target_language(),
            provider: ProviderConfig::default(),
            chunking: ChunkingConfig::default(),
            cache: CacheConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
