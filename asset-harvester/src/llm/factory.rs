use super::anthropic::AnthropicBackend;
use super::cache::{CacheRegistry, CachingGateway, ResponseCache};
use super::fallback::FallbackGateway;
use super::mock::MockBackend;
use super::ollama::OllamaBackend;
use super::openai::OpenAiBackend;
use super::provider::ProviderGateway;
use super::{CompletionBackend, LlmGateway};
use crate::config::{ConfigError, Settings};
use std::sync::Arc;
use tracing::info;
use url::Url;

const LOCAL_PROVIDERS: &[&str] = &["ollama", "mock"];
const CLOUD_PROVIDERS: &[&str] = &["openai", "anthropic"];

/// Replies "not a transaction" to everything. Used for offline dry runs.
const MOCK_DEFAULT_REPLY: &str =
    r#"{"is_crypto_purchase": false, "confidence": 0.0, "reasoning": "mock backend", "transactions": []}"#;

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn is_known(provider: &str) -> bool {
    LOCAL_PROVIDERS.contains(&provider) || CLOUD_PROVIDERS.contains(&provider)
}

fn is_cloud(provider: &str) -> bool {
    CLOUD_PROVIDERS.contains(&provider)
}

fn backend_for(provider: &str, settings: &Settings, timeout_secs: u64) -> Result<Arc<dyn CompletionBackend>, ConfigError> {
    let backend: Arc<dyn CompletionBackend> = match provider {
        "ollama" => {
            Url::parse(&settings.ollama_base_url).map_err(|e| {
                ConfigError::Invalid(format!("ollama_base_url '{}': {}", settings.ollama_base_url, e))
            })?;
            Arc::new(
                OllamaBackend::new(&settings.ollama_base_url, &settings.llm_model_name, timeout_secs)
                    .map_err(|e| ConfigError::Invalid(e.to_string()))?,
            )
        }
        "openai" => {
            if settings.openai_api_key.trim().is_empty() {
                return Err(ConfigError::MissingApiKey(provider.to_string()));
            }
            Arc::new(
                OpenAiBackend::new(&settings.openai_api_key, &settings.openai_model_name, timeout_secs)
                    .map_err(|e| ConfigError::Invalid(e.to_string()))?,
            )
        }
        "anthropic" => {
            if settings.anthropic_api_key.trim().is_empty() {
                return Err(ConfigError::MissingApiKey(provider.to_string()));
            }
            Arc::new(
                AnthropicBackend::new(&settings.anthropic_api_key, &settings.anthropic_model_name, timeout_secs)
                    .map_err(|e| ConfigError::Invalid(e.to_string()))?,
            )
        }
        "mock" => Arc::new(MockBackend::new("dry-run").with_default_reply(MOCK_DEFAULT_REPLY)),
        other => return Err(ConfigError::UnknownProvider(other.to_string())),
    };
    Ok(backend)
}

/// Build the cache -> fallback -> provider chain once, from settings alone.
/// Every configuration conflict is reported here rather than at call time.
pub fn build_gateway(settings: &Settings, caches: Option<&CacheRegistry>) -> Result<Arc<dyn LlmGateway>, ConfigError> {
    let provider = normalize(&settings.llm_provider);
    if !is_known(&provider) {
        return Err(ConfigError::UnknownProvider(settings.llm_provider.clone()));
    }

    if settings.enable_privacy_mode {
        if is_cloud(&provider) {
            return Err(ConfigError::PrivacyProviderRejected(provider));
        }
        if settings.enable_ollama_fallback {
            return Err(ConfigError::PrivacyFallbackRejected);
        }
    }

    if is_cloud(&provider) && !settings.enable_cloud_llm {
        return Err(ConfigError::CloudDisabled(provider));
    }

    let mut gateway: Arc<dyn LlmGateway> = if provider == "ollama" && settings.enable_ollama_fallback {
        let secondary_name = normalize(&settings.fallback_provider);
        if !is_cloud(&secondary_name) {
            return Err(ConfigError::UnknownProvider(settings.fallback_provider.clone()));
        }
        if !settings.enable_cloud_llm {
            return Err(ConfigError::CloudDisabled(secondary_name));
        }

        let primary = ProviderGateway::new(backend_for(&provider, settings, settings.fallback_timeout_seconds)?, 1)
            .with_temperature(settings.llm_temperature);
        let secondary = ProviderGateway::new(
            backend_for(&secondary_name, settings, settings.llm_timeout_seconds)?,
            settings.llm_max_retries,
        )
        .with_temperature(settings.llm_temperature);

        info!("Using {} with fallback to {}", provider, secondary_name);
        Arc::new(FallbackGateway::new(Arc::new(primary), Arc::new(secondary)))
    } else {
        info!("Using LLM provider {}", provider);
        Arc::new(
            ProviderGateway::new(
                backend_for(&provider, settings, settings.llm_timeout_seconds)?,
                settings.llm_max_retries,
            )
            .with_temperature(settings.llm_temperature),
        )
    };

    if settings.enable_llm_cache {
        let cache = match caches {
            Some(registry) => registry.get_or_open(&settings.llm_cache_file),
            None => Arc::new(ResponseCache::open(&settings.llm_cache_file)),
        };
        info!("LLM response cache at {}", cache.path().display());
        gateway = Arc::new(CachingGateway::new(gateway, cache));
    }

    Ok(gateway)
}
