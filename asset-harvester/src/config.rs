use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "config/config.toml";
pub const CONFIG_FILE_ENV: &str = "HARVESTER_CONFIG_FILE";
pub const ENV_PREFIX: &str = "DAP";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid setting: {0}")]
    Invalid(String),

    #[error("Unknown LLM provider: {0}")]
    UnknownProvider(String),

    #[error("Cloud LLM providers are not enabled (requested '{0}')")]
    CloudDisabled(String),

    #[error("Privacy mode is enabled. LLM provider '{0}' is not allowed")]
    PrivacyProviderRejected(String),

    #[error("Privacy mode is enabled. Ollama fallback to cloud LLM is not allowed")]
    PrivacyFallbackRejected,

    #[error("Missing API key for LLM provider '{0}'")]
    MissingApiKey(String),
}

/// Immutable runtime configuration, built once at start-up and passed by reference.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Model selection
    pub llm_provider: String,
    pub llm_model_name: String,
    pub llm_max_retries: u32,
    pub llm_timeout_seconds: u64,
    pub llm_temperature: Option<f64>,
    pub enable_cloud_llm: bool,
    pub ollama_base_url: String,
    pub openai_api_key: String,
    pub openai_model_name: String,
    pub anthropic_api_key: String,
    pub anthropic_model_name: String,

    // Failover
    pub enable_ollama_fallback: bool,
    pub fallback_provider: String,
    pub fallback_timeout_seconds: u64,

    // Privacy
    pub enable_privacy_mode: bool,
    pub enable_pii_scrubbing: bool,

    // Pipeline behaviour
    pub enable_preprocessing: bool,
    pub enable_regex_extractors: bool,
    pub enable_validation: bool,
    pub strict_validation: bool,
    pub require_numeric_validation: bool,
    pub allow_unknown_cryptos: bool,
    pub min_confidence_threshold: f64,
    pub default_timezone: String,

    // Persistence
    pub enable_llm_cache: bool,
    pub llm_cache_file: PathBuf,
    pub dedup_history_file: Option<PathBuf>,

    // Logging
    pub log_level: String,
    pub log_json_output: bool,

    // Batch execution
    pub batch_size: usize,
    pub enable_parallel_processing: bool,
    pub max_workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm_provider: "ollama".to_string(),
            llm_model_name: "llama3.2:3b".to_string(),
            llm_max_retries: 3,
            llm_timeout_seconds: 30,
            llm_temperature: None,
            enable_cloud_llm: false,
            ollama_base_url: "http://localhost:11434".to_string(),
            openai_api_key: String::new(),
            openai_model_name: "gpt-4-turbo-preview".to_string(),
            anthropic_api_key: String::new(),
            anthropic_model_name: "claude-3-sonnet-20240229".to_string(),
            enable_ollama_fallback: false,
            fallback_provider: "openai".to_string(),
            fallback_timeout_seconds: 10,
            enable_privacy_mode: false,
            enable_pii_scrubbing: false,
            enable_preprocessing: true,
            enable_regex_extractors: true,
            enable_validation: true,
            strict_validation: true,
            require_numeric_validation: true,
            allow_unknown_cryptos: true,
            min_confidence_threshold: 0.6,
            default_timezone: "UTC".to_string(),
            enable_llm_cache: false,
            llm_cache_file: PathBuf::from(".cache/llm_cache.json"),
            dedup_history_file: None,
            log_level: "info".to_string(),
            log_json_output: false,
            batch_size: 10,
            enable_parallel_processing: false,
            max_workers: 5,
        }
    }
}

// API keys never reach the logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("llm_provider", &self.llm_provider)
            .field("llm_model_name", &self.llm_model_name)
            .field("llm_max_retries", &self.llm_max_retries)
            .field("llm_timeout_seconds", &self.llm_timeout_seconds)
            .field("llm_temperature", &self.llm_temperature)
            .field("enable_cloud_llm", &self.enable_cloud_llm)
            .field("ollama_base_url", &self.ollama_base_url)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openai_model_name", &self.openai_model_name)
            .field("anthropic_api_key", &redact(&self.anthropic_api_key))
            .field("anthropic_model_name", &self.anthropic_model_name)
            .field("enable_ollama_fallback", &self.enable_ollama_fallback)
            .field("fallback_provider", &self.fallback_provider)
            .field("fallback_timeout_seconds", &self.fallback_timeout_seconds)
            .field("enable_privacy_mode", &self.enable_privacy_mode)
            .field("enable_pii_scrubbing", &self.enable_pii_scrubbing)
            .field("enable_preprocessing", &self.enable_preprocessing)
            .field("enable_regex_extractors", &self.enable_regex_extractors)
            .field("enable_validation", &self.enable_validation)
            .field("strict_validation", &self.strict_validation)
            .field("require_numeric_validation", &self.require_numeric_validation)
            .field("allow_unknown_cryptos", &self.allow_unknown_cryptos)
            .field("min_confidence_threshold", &self.min_confidence_threshold)
            .field("default_timezone", &self.default_timezone)
            .field("enable_llm_cache", &self.enable_llm_cache)
            .field("llm_cache_file", &self.llm_cache_file)
            .field("dedup_history_file", &self.dedup_history_file)
            .field("log_level", &self.log_level)
            .field("log_json_output", &self.log_json_output)
            .field("batch_size", &self.batch_size)
            .field("enable_parallel_processing", &self.enable_parallel_processing)
            .field("max_workers", &self.max_workers)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}

impl Settings {
    /// Defaults, then `file` (or the one named by `HARVESTER_CONFIG_FILE`, or the default
    /// path), then `DAP_*` environment variables, then `overrides`.
    pub fn load(file: Option<&Path>, overrides: &[(&str, &str)]) -> Result<Self, ConfigError> {
        let file = match file {
            Some(path) => path.to_path_buf(),
            None => std::env::var(CONFIG_FILE_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE)),
        };
        overrides
            .iter()
            .fold(SettingsLoader::new().with_file(file), |loader, (key, value)| {
                loader.with_override(*key, *value)
            })
            .load()
    }

    /// PII is scrubbed whenever privacy mode is on, regardless of the explicit flag.
    pub fn pii_scrubbing_active(&self) -> bool {
        self.enable_pii_scrubbing || self.enable_privacy_mode
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "min_confidence_threshold must be within [0, 1], got {}",
                self.min_confidence_threshold
            )));
        }
        if self.max_workers == 0 {
            return Err(ConfigError::Invalid("max_workers must be at least 1".to_string()));
        }
        if self.llm_max_retries == 0 {
            return Err(ConfigError::Invalid("llm_max_retries must be at least 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Layered settings builder: defaults < file < environment < explicit overrides.
#[derive(Debug, Default)]
pub struct SettingsLoader {
    file: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
    overrides: Vec<(String, String)>,
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Optional TOML file; a missing file is not an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Replace the process environment with a fixed map (keys like `DAP_LLM_PROVIDER`).
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }

    pub fn load(self) -> Result<Settings, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = &self.file {
            builder = builder.add_source(File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(self.env),
        );

        for (key, value) in self.overrides {
            builder = builder.set_override(key, value)?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        debug!("Loaded harvester settings: {:?}", settings);
        Ok(settings)
    }
}
