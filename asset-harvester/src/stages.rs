use crate::config::Settings;
use crate::llm::error::LlmError;
use crate::llm::{GenerateOptions, LlmGateway, StructuredResponse};
use crate::metrics::MetricsTracker;
use crate::prompts::{self, PromptLibrary};
use crate::types::{ExtractionMethod, RawTransaction};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// What the model said about one email.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub is_crypto_purchase: bool,
    pub confidence: f64,
    pub reasoning: String,
}

impl Classification {
    /// Read the classification payload. Missing fields mean "no" with neutral confidence.
    pub fn from_payload(data: &Map<String, Value>) -> Self {
        let is_crypto_purchase = match data.get("is_crypto_purchase") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        };
        let confidence = match data.get("confidence") {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.5),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0.5),
            _ => 0.5,
        };
        let reasoning = data
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or("No reasoning provided")
            .to_string();
        Self {
            is_crypto_purchase,
            confidence,
            reasoning,
        }
    }
}

fn generate_options(settings: &Settings) -> GenerateOptions {
    GenerateOptions {
        model: None,
        temperature: settings.llm_temperature,
        max_retries: Some(settings.llm_max_retries),
    }
}

/// One gateway call with the bookkeeping both stages share.
async fn call_gateway(
    gateway: &dyn LlmGateway,
    metrics: &MetricsTracker,
    latency_name: &str,
    prompt: &str,
    options: &GenerateOptions,
) -> Result<StructuredResponse, LlmError> {
    let started = Instant::now();
    let result = gateway.generate_structured(prompt, options).await;
    metrics.increment("llm_calls_total");

    match &result {
        Ok(response) => {
            metrics.record_latency(latency_name, started.elapsed());
            if response.metadata.cached {
                metrics.increment("llm_cache_hits");
            } else {
                metrics.increment("llm_cache_misses");
            }
            if response.metadata.fallback_used {
                metrics.increment("llm_fallback_usage");
            }
        }
        Err(_) => metrics.increment("llm_calls_failed"),
    }
    result
}

/// "Is this a transaction email?", gated by a confidence threshold.
pub struct ClassificationStage {
    gateway: Arc<dyn LlmGateway>,
    prompts: Arc<PromptLibrary>,
    metrics: Arc<MetricsTracker>,
    options: GenerateOptions,
    min_confidence: f64,
}

impl ClassificationStage {
    pub fn new(
        settings: &Settings,
        gateway: Arc<dyn LlmGateway>,
        prompts: Arc<PromptLibrary>,
        metrics: Arc<MetricsTracker>,
    ) -> Self {
        Self {
            gateway,
            prompts,
            metrics,
            options: generate_options(settings),
            min_confidence: settings.min_confidence_threshold,
        }
    }

    pub async fn classify(&self, email_content: &str) -> Result<Classification, LlmError> {
        let context = HashMap::from([("email_content", email_content)]);
        let prompt = self
            .prompts
            .render(prompts::CLASSIFICATION, &context)
            .ok_or_else(|| LlmError::MissingPrompt(prompts::CLASSIFICATION.to_string()))?;

        let response = call_gateway(
            self.gateway.as_ref(),
            &self.metrics,
            "llm_classification",
            &prompt,
            &self.options,
        )
        .await?;

        let classification = Classification::from_payload(&response.data);
        info!(
            decision = classification.is_crypto_purchase,
            confidence = classification.confidence,
            "Classification result: {}",
            classification.reasoning
        );
        Ok(classification)
    }

    /// Positive and confident enough.
    pub fn accepts(&self, classification: &Classification) -> bool {
        if !classification.is_crypto_purchase {
            return false;
        }
        if classification.confidence < self.min_confidence {
            info!(
                "Classification below confidence threshold ({:.2} < {:.2})",
                classification.confidence, self.min_confidence
            );
            return false;
        }
        true
    }
}

/// Candidates the model produced, plus why any were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionOutcome {
    pub candidates: Vec<RawTransaction>,
    pub notes: Vec<String>,
}

/// Structured transaction extraction through the model.
pub struct ExtractionStage {
    gateway: Arc<dyn LlmGateway>,
    prompts: Arc<PromptLibrary>,
    metrics: Arc<MetricsTracker>,
    options: GenerateOptions,
    default_timezone: String,
    strict: bool,
    min_confidence: f64,
}

impl ExtractionStage {
    pub fn new(
        settings: &Settings,
        gateway: Arc<dyn LlmGateway>,
        prompts: Arc<PromptLibrary>,
        metrics: Arc<MetricsTracker>,
    ) -> Self {
        Self {
            gateway,
            prompts,
            metrics,
            options: generate_options(settings),
            default_timezone: settings.default_timezone.clone(),
            strict: settings.strict_validation,
            min_confidence: settings.min_confidence_threshold,
        }
    }

    pub async fn extract(&self, email_content: &str) -> Result<ExtractionOutcome, LlmError> {
        let context = HashMap::from([
            ("email_content", email_content),
            ("default_timezone", self.default_timezone.as_str()),
        ]);
        let prompt = self
            .prompts
            .render(prompts::EXTRACTION, &context)
            .ok_or_else(|| LlmError::MissingPrompt(prompts::EXTRACTION.to_string()))?;

        let response = call_gateway(
            self.gateway.as_ref(),
            &self.metrics,
            "llm_extraction",
            &prompt,
            &self.options,
        )
        .await?;

        Ok(self.screen(parse_transactions(&response.data)))
    }

    /// Drop candidates that are incomplete or unsure, when strict.
    fn screen(&self, candidates: Vec<RawTransaction>) -> ExtractionOutcome {
        let mut outcome = ExtractionOutcome::default();

        for candidate in candidates {
            let missing = candidate.missing_fields();
            let confidence = candidate
                .confidence
                .unwrap_or_else(|| ExtractionMethod::default_confidence(candidate.extraction_method));
            info!(
                confidence,
                missing_fields = %missing.join(";"),
                "Extraction completed"
            );

            if self.strict && confidence < self.min_confidence {
                warn!(
                    "Extraction confidence {:.2} below threshold {:.2}",
                    confidence, self.min_confidence
                );
                outcome.notes.push(format!(
                    "Dropped {} candidate: confidence {:.2} below threshold {:.2}",
                    candidate.item_name.as_deref().unwrap_or("unnamed"),
                    confidence,
                    self.min_confidence
                ));
                continue;
            }

            if !missing.is_empty() {
                warn!("Missing required field(s): {}", missing.join(", "));
                if self.strict {
                    outcome
                        .notes
                        .push(format!("Dropped candidate missing {}", missing.join(", ")));
                    continue;
                }
                outcome
                    .notes
                    .push(format!("Candidate kept despite missing {}", missing.join(", ")));
            }

            if candidate.missing_fiat() {
                outcome.notes.push(format!(
                    "{} purchase has no fiat total or currency",
                    candidate.item_name.as_deref().unwrap_or("unnamed")
                ));
            }

            outcome.candidates.push(candidate);
        }

        outcome
    }
}

/// The `transactions` array of an extraction payload. Entries that are not objects are skipped.
pub fn parse_transactions(data: &Map<String, Value>) -> Vec<RawTransaction> {
    let transactions = match data.get("transactions") {
        Some(Value::Array(items)) => items,
        Some(other) => {
            warn!("Expected transactions list, but got {}", json_kind(other));
            return vec![];
        }
        None => {
            info!("No purchase information found in the email");
            return vec![];
        }
    };

    transactions
        .iter()
        .filter_map(|item| match serde_json::from_value::<RawTransaction>(item.clone()) {
            Ok(mut candidate) if item.is_object() => {
                candidate.extraction_method = Some(ExtractionMethod::Llm);
                Some(candidate)
            }
            Ok(_) => {
                warn!("Skipping non-object transaction entry: {}", json_kind(item));
                None
            }
            Err(e) => {
                warn!("Skipping unreadable transaction entry: {}", e);
                None
            }
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
