use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single call to one backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),
}

impl ProviderError {
    /// Transient failures are retried; the rest fail the call at once.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ProviderError::Authentication(_) | ProviderError::BadRequest(_) | ProviderError::UnsupportedProvider(_)
        )
    }

    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => ProviderError::Authentication(body),
            400 | 404 | 422 => ProviderError::BadRequest(body),
            code => ProviderError::Http { status: code, body },
        }
    }

    pub fn from_reqwest(error: reqwest::Error, timeout_secs: u64) -> Self {
        if error.is_timeout() {
            ProviderError::Timeout(timeout_secs)
        } else if let Some(status) = error.status() {
            ProviderError::from_status(status, error.to_string())
        } else {
            ProviderError::Network(error.to_string())
        }
    }
}

/// What a gateway surfaces to the pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("LLM call failed after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    #[error("LLM call failed without retry: {0}")]
    NonRecoverable(#[source] ProviderError),

    #[error("Response cache error: {0}")]
    Cache(String),

    #[error("No prompt template named '{0}'")]
    MissingPrompt(String),
}

impl LlmError {
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, LlmError::NonRecoverable(_) | LlmError::MissingPrompt(_))
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
