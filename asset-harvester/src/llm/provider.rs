use super::error::{LlmError, ProviderError, Result};
use super::retry::JitteredExponential;
use super::{CompletionBackend, CompletionRequest, GenerateOptions, LlmGateway, ResponseMetadata, StructuredResponse};
use async_trait::async_trait;
use backoff::backoff::Backoff;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Shared HTTP client for the provider backends.
pub(crate) fn http_client(timeout_secs: u64) -> std::result::Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .gzip(true)
        .deflate(true)
        .brotli(true)
        .build()
        .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {}", e)))
}

/// Turn a non-2xx response into the matching error.
pub(crate) async fn check_status(response: reqwest::Response) -> std::result::Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::from_status(status, body))
}

/// The reply must be exactly one JSON object.
pub fn parse_json_object(text: &str) -> std::result::Result<Map<String, Value>, ProviderError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ProviderError::MalformedOutput(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(ProviderError::MalformedOutput(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One backend behind retry and JSON parsing.
pub struct ProviderGateway {
    backend: Arc<dyn CompletionBackend>,
    max_retries: u32,
    temperature: Option<f64>,
    retry_base: Duration,
}

impl ProviderGateway {
    pub fn new(backend: Arc<dyn CompletionBackend>, max_retries: u32) -> Self {
        Self {
            backend,
            max_retries: max_retries.max(1),
            temperature: None,
            retry_base: Duration::from_secs(1),
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f64>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    fn request(&self, prompt: &str, options: &GenerateOptions) -> CompletionRequest {
        CompletionRequest {
            prompt: prompt.to_string(),
            model: options.model.clone().unwrap_or_else(|| self.backend.default_model()),
            temperature: options.temperature.or(self.temperature),
        }
    }

    async fn attempt(&self, request: &CompletionRequest) -> std::result::Result<(Map<String, Value>, String), ProviderError> {
        let text = self.backend.complete(request).await?;
        let data = parse_json_object(&text)?;
        Ok((data, text))
    }
}

#[async_trait]
impl LlmGateway for ProviderGateway {
    fn gateway_name(&self) -> String {
        self.backend.provider_name()
    }

    async fn generate_structured(&self, prompt: &str, options: &GenerateOptions) -> Result<StructuredResponse> {
        let request = self.request(prompt, options);
        let max_attempts = options.max_retries.unwrap_or(self.max_retries).max(1);
        let mut backoff = JitteredExponential::new(max_attempts).with_base(self.retry_base);
        let provider = self.backend.provider_name();

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(&request).await {
                Ok((data, raw_text)) => {
                    debug!("{} answered on attempt {}", provider, attempt);
                    return Ok(StructuredResponse {
                        data,
                        raw_text,
                        metadata: ResponseMetadata {
                            provider,
                            attempts: attempt,
                            ..Default::default()
                        },
                    });
                }
                Err(e) if !e.is_recoverable() => {
                    error!("{} failed with a non-recoverable error: {}", provider, e);
                    return Err(LlmError::NonRecoverable(e));
                }
                Err(e) => match backoff.next_backoff() {
                    Some(delay) => {
                        warn!(
                            "Attempt {}/{} against {} failed ({}), retrying in {:?}",
                            attempt, max_attempts, provider, e, delay
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        error!("{} failed after {} attempt(s): {}", provider, attempt, e);
                        return Err(LlmError::Exhausted {
                            attempts: attempt,
                            source: e,
                        });
                    }
                },
            }
        }
    }
}
