#![allow(dead_code)]

use asset_harvester::llm::{MockBackend, ProviderError, ProviderGateway};
use asset_harvester::telemetry;
use asset_harvester::{DedupIndex, Harvester, LlmGateway, Settings};
use interfaces::Email;
use serde_json::Value;
use std::sync::{Arc, Once};
use std::time::Duration;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let settings = Settings {
            log_level: "debug".to_string(),
            ..Settings::default()
        };
        telemetry::init_tracing(&settings);
    });
}

/// Defaults with no file or environment involved.
pub fn test_settings() -> Settings {
    Settings {
        llm_provider: "mock".to_string(),
        ..Settings::default()
    }
}

/// Mock backend that answers classification and extraction prompts separately.
pub fn scripted_backend(classification: Value, extraction: Value) -> Arc<MockBackend> {
    let classification = classification.to_string();
    let extraction = extraction.to_string();
    Arc::new(MockBackend::new("scripted").with_router(move |prompt: &str| -> Result<String, ProviderError> {
        if prompt.contains("EXTRACTION INSTRUCTIONS") {
            Ok(extraction.clone())
        } else {
            Ok(classification.clone())
        }
    }))
}

pub fn gateway_over(backend: Arc<MockBackend>, max_retries: u32) -> Arc<dyn LlmGateway> {
    Arc::new(ProviderGateway::new(backend, max_retries).with_retry_base(Duration::from_millis(10)))
}

pub fn harvester(settings: Settings, backend: Arc<MockBackend>) -> Arc<Harvester> {
    let gateway = gateway_over(backend, settings.llm_max_retries);
    Arc::new(Harvester::new(settings, gateway, Arc::new(DedupIndex::in_memory())))
}

pub fn coinbase_email() -> Email {
    Email::new(
        "You bought Bitcoin",
        "Coinbase <no-reply@coinbase.com>",
        "Mon, 15 Jan 2024 10:30:00 +0000",
        "You successfully purchased 0.001 BTC for $100.00 USD.",
    )
}

/// Passes the keyword gate but no vendor extractor knows the sender.
pub fn unknown_exchange_email(subject: &str) -> Email {
    Email::new(
        subject,
        "orders@example-exchange.io",
        "Tue, 16 Jan 2024 08:00:00 +0000",
        "Your order is complete. You bought 0.5 ETH for 1,200.00 EUR. Order #EX-9921",
    )
}
