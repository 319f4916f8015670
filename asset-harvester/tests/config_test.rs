mod common;

use asset_harvester::{ConfigError, Settings, SettingsLoader};
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn missing_file_and_empty_environment_give_defaults() {
    common::init_tracing();
    let dir = TempDir::new().unwrap();
    let settings = SettingsLoader::new()
        .with_file(dir.path().join("absent.toml"))
        .with_env(HashMap::new())
        .load()
        .unwrap();
    assert_eq!(settings, Settings::default());
}

#[test]
fn environment_variables_use_the_prefix() {
    let settings = SettingsLoader::new()
        .with_env(env(&[
            ("DAP_LLM_PROVIDER", "anthropic"),
            ("DAP_ENABLE_CLOUD_LLM", "true"),
            ("DAP_MIN_CONFIDENCE_THRESHOLD", "0.75"),
            ("DAP_MAX_WORKERS", "8"),
            ("UNRELATED", "ignored"),
        ]))
        .load()
        .unwrap();

    assert_eq!(settings.llm_provider, "anthropic");
    assert!(settings.enable_cloud_llm);
    assert_eq!(settings.min_confidence_threshold, 0.75);
    assert_eq!(settings.max_workers, 8);
}

#[test]
fn file_then_environment_then_overrides() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
llm_provider = "openai"
llm_model_name = "from-file"
max_workers = 2
strict_validation = false
"#,
    )
    .unwrap();

    let settings = SettingsLoader::new()
        .with_file(&path)
        .with_env(env(&[("DAP_LLM_MODEL_NAME", "from-env"), ("DAP_MAX_WORKERS", "4")]))
        .with_override("max_workers", "6")
        .load()
        .unwrap();

    assert_eq!(settings.llm_provider, "openai");
    assert_eq!(settings.llm_model_name, "from-env");
    assert_eq!(settings.max_workers, 6);
    assert!(!settings.strict_validation);
    // untouched keys keep their defaults
    assert_eq!(settings.llm_max_retries, 3);
}

#[test]
fn out_of_range_values_are_rejected() {
    let err = SettingsLoader::new()
        .with_env(env(&[("DAP_MIN_CONFIDENCE_THRESHOLD", "1.5")]))
        .load()
        .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "{err}");

    let err = SettingsLoader::new()
        .with_env(HashMap::new())
        .with_override("max_workers", "0")
        .load()
        .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
}

#[test]
fn privacy_mode_implies_scrubbing() {
    let settings = Settings {
        enable_privacy_mode: true,
        ..Settings::default()
    };
    assert!(settings.pii_scrubbing_active());
    assert!(!Settings::default().pii_scrubbing_active());
}

#[test]
fn load_applies_call_site_overrides_last() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "max_workers = 2\nllm_provider = \"mock\"\n").unwrap();

    let settings = Settings::load(Some(path.as_path()), &[("max_workers", "7")]).unwrap();
    assert_eq!(settings.max_workers, 7);
    assert_eq!(settings.llm_provider, "mock");
}

#[test]
fn debug_output_hides_api_keys() {
    let settings = Settings {
        openai_api_key: "sk-SECRET123".to_string(),
        anthropic_api_key: "sk-ant-SECRET456".to_string(),
        ..Settings::default()
    };
    let printed = format!("{:?}", settings);
    assert!(!printed.contains("SECRET"), "{printed}");
    assert!(printed.contains("openai_api_key: \"<redacted>\""));
    assert!(printed.contains("llm_provider: \"ollama\""));
}
