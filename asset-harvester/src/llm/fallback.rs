use super::error::Result;
use super::{GenerateOptions, LlmGateway, StructuredResponse};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub const PRIMARY: &str = "primary";
pub const SECONDARY: &str = "secondary";

/// Primary gets a single attempt (its backend carries the short timeout);
/// any failure hands the call to the secondary with the caller's options.
pub struct FallbackGateway {
    primary: Arc<dyn LlmGateway>,
    secondary: Arc<dyn LlmGateway>,
}

impl FallbackGateway {
    pub fn new(primary: Arc<dyn LlmGateway>, secondary: Arc<dyn LlmGateway>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl LlmGateway for FallbackGateway {
    fn gateway_name(&self) -> String {
        format!("{} -> {}", self.primary.gateway_name(), self.secondary.gateway_name())
    }

    async fn generate_structured(&self, prompt: &str, options: &GenerateOptions) -> Result<StructuredResponse> {
        let primary_options = options.clone().with_max_retries(1);
        match self.primary.generate_structured(prompt, &primary_options).await {
            Ok(mut response) => {
                response.metadata.fallback_used = false;
                response.metadata.provider_used = Some(PRIMARY.to_string());
                Ok(response)
            }
            Err(e) => {
                warn!(
                    "Primary LLM {} failed ({}), falling back to {}",
                    self.primary.gateway_name(),
                    e,
                    self.secondary.gateway_name()
                );
                let mut response = self.secondary.generate_structured(prompt, options).await?;
                info!("Fallback LLM {} served the request", self.secondary.gateway_name());
                response.metadata.fallback_used = true;
                response.metadata.provider_used = Some(SECONDARY.to_string());
                Ok(response)
            }
        }
    }
}
