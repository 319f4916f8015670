use super::error::ProviderError;
use super::{CompletionBackend, CompletionRequest};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

type Router = Box<dyn Fn(&str) -> Result<String, ProviderError> + Send + Sync>;

/// Scripted backend for tests and dry runs.
///
/// Replies come from the queue first, then from the router, then from the default reply.
/// With none of those set every call is an empty response.
pub struct MockBackend {
    name: String,
    response_delay_ms: u64,
    queue: Mutex<VecDeque<Result<String, ProviderError>>>,
    router: Option<Router>,
    default_reply: Option<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            response_delay_ms: 0,
            queue: Mutex::new(VecDeque::new()),
            router: None,
            default_reply: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.response_delay_ms = delay_ms;
        self
    }

    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.push(Ok(reply.into()));
        self
    }

    pub fn with_json(self, reply: Value) -> Self {
        self.with_reply(reply.to_string())
    }

    pub fn with_error(self, error: ProviderError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn with_default_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = Some(reply.into());
        self
    }

    /// Answer by looking at the prompt, for callers that do not know the call order.
    pub fn with_router<F>(mut self, router: F) -> Self
    where
        F: Fn(&str) -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        self.router = Some(Box::new(router));
        self
    }

    pub fn push(&self, reply: Result<String, ProviderError>) {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(reply);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    async fn simulate_processing(&self) {
        if self.response_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.response_delay_ms)).await;
        }
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    fn provider_name(&self) -> String {
        format!("mock:{}", self.name)
    }

    fn default_model(&self) -> String {
        "mock-model".to_string()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.prompt.clone());
        self.simulate_processing().await;

        let queued = self
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        if let Some(reply) = queued {
            debug!("Mock backend {} answering from queue", self.name);
            return reply;
        }
        if let Some(router) = &self.router {
            return router(&request.prompt);
        }
        self.default_reply.clone().ok_or(ProviderError::EmptyResponse)
    }
}
