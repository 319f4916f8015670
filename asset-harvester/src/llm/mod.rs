//! Model gateway: one structured-JSON call, with retry, failover and caching
//! layered as decorators over the raw provider backends.

pub mod anthropic;
pub mod cache;
pub mod error;
pub mod factory;
pub mod fallback;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod retry;

pub use cache::{CacheRegistry, CachingGateway, ResponseCache};
pub use error::{LlmError, ProviderError};
pub use factory::build_gateway;
pub use fallback::FallbackGateway;
pub use mock::MockBackend;
pub use provider::ProviderGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-call knobs. Absent values fall back to the backend's configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateOptions {
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_retries: Option<u32>,
}

impl GenerateOptions {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub provider: String,
    pub attempts: u32,
    pub cached: bool,
    pub fallback_used: bool,
    /// `primary` or `secondary` when the response went through a fallback chain.
    pub provider_used: Option<String>,
}

/// A parsed JSON object plus the text it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredResponse {
    pub data: Map<String, Value>,
    pub raw_text: String,
    pub metadata: ResponseMetadata,
}

/// What the pipeline stages talk to.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    fn gateway_name(&self) -> String;

    async fn generate_structured(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> error::Result<StructuredResponse>;
}

/// One raw completion request as sent to a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub model: String,
    pub temperature: Option<f64>,
}

/// A single provider, one HTTP round trip per call, no retry.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn provider_name(&self) -> String;

    fn default_model(&self) -> String;

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}
