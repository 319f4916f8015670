mod common;

use asset_harvester::llm::CacheRegistry;
use asset_harvester::{build_gateway, ConfigError, GenerateOptions, Settings};
use tempfile::TempDir;

fn build_error(settings: &Settings) -> ConfigError {
    build_gateway(settings, None).err().expect("expected a configuration error")
}

#[test]
fn unknown_providers_are_rejected_up_front() {
    common::init_tracing();
    let settings = Settings {
        llm_provider: "foo".to_string(),
        ..Settings::default()
    };
    let err = build_error(&settings);
    assert!(matches!(err, ConfigError::UnknownProvider(_)));
    assert_eq!(err.to_string(), "Unknown LLM provider: foo");
}

#[test]
fn cloud_providers_need_the_cloud_switch() {
    let settings = Settings {
        llm_provider: "openai".to_string(),
        openai_api_key: "sk-test".to_string(),
        ..Settings::default()
    };
    assert!(matches!(build_error(&settings), ConfigError::CloudDisabled(_)));
}

#[test]
fn privacy_mode_blocks_cloud_and_cloud_fallback() {
    let cloud = Settings {
        llm_provider: "anthropic".to_string(),
        anthropic_api_key: "key".to_string(),
        enable_cloud_llm: true,
        enable_privacy_mode: true,
        ..Settings::default()
    };
    assert!(matches!(build_error(&cloud), ConfigError::PrivacyProviderRejected(_)));

    let fallback = Settings {
        llm_provider: "ollama".to_string(),
        enable_ollama_fallback: true,
        enable_cloud_llm: true,
        openai_api_key: "sk-test".to_string(),
        enable_privacy_mode: true,
        ..Settings::default()
    };
    assert!(matches!(build_error(&fallback), ConfigError::PrivacyFallbackRejected));
}

#[test]
fn cloud_providers_need_a_key() {
    let settings = Settings {
        llm_provider: "openai".to_string(),
        enable_cloud_llm: true,
        ..Settings::default()
    };
    assert!(matches!(build_error(&settings), ConfigError::MissingApiKey(_)));
}

#[test]
fn ollama_with_fallback_chains_both_providers() {
    let settings = Settings {
        llm_provider: "Ollama".to_string(),
        enable_ollama_fallback: true,
        enable_cloud_llm: true,
        fallback_provider: "anthropic".to_string(),
        anthropic_api_key: "key".to_string(),
        ..Settings::default()
    };
    let gateway = build_gateway(&settings, None).unwrap();
    assert!(gateway.gateway_name().contains(" -> "), "{}", gateway.gateway_name());
}

#[tokio::test]
async fn mock_provider_answers_not_a_purchase_offline() {
    let dir = TempDir::new().unwrap();
    let caches = CacheRegistry::new();
    let settings = Settings {
        llm_provider: "mock".to_string(),
        enable_llm_cache: true,
        llm_cache_file: dir.path().join("cache.json"),
        ..Settings::default()
    };

    let gateway = build_gateway(&settings, Some(&caches)).unwrap();
    assert!(gateway.gateway_name().starts_with("cached("));

    let response = gateway
        .generate_structured("anything", &GenerateOptions::default())
        .await
        .unwrap();
    assert_eq!(response.data["is_crypto_purchase"], serde_json::json!(false));

    // the registry shares the cache with any later gateway on the same path
    let again = build_gateway(&settings, Some(&caches)).unwrap();
    let cached = again
        .generate_structured("anything", &GenerateOptions::default())
        .await
        .unwrap();
    assert!(cached.metadata.cached);
}
