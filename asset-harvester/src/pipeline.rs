use crate::config::Settings;
use crate::dates;
use crate::dedup::{email_hash, DedupIndex};
use crate::extractors::ExtractorRegistry;
use crate::llm::cache::CacheRegistry;
use crate::llm::{self, LlmGateway};
use crate::metrics::MetricsTracker;
use crate::pii::PiiScrubber;
use crate::preprocess;
use crate::prompts::{self, PromptLibrary};
use crate::stages::{ClassificationStage, ExtractionStage};
use crate::types::{ProcessingOutcome, PurchaseRecord, RawTransaction, Result, TransactionType};
use crate::validation::{Checked, ValidationPolicy};
use interfaces::Email;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Called with `(completed, total)` after every finished email.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Totals for one batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub emails_processed: usize,
    pub emails_skipped_duplicate: usize,
    pub purchases: Vec<PurchaseRecord>,
    pub notes: Vec<String>,
    pub metrics: BTreeMap<String, f64>,
}

impl BatchSummary {
    fn absorb(&mut self, outcome: ProcessingOutcome) {
        self.emails_processed += 1;
        self.purchases.extend(outcome.purchases);
        self.notes.extend(outcome.processing_notes);
    }
}

/// The escalation pipeline: keyword gate, vendor extractors, model classification,
/// model extraction, validation and deduplication.
pub struct Harvester {
    settings: Settings,
    registry: ExtractorRegistry,
    classification: ClassificationStage,
    extraction: ExtractionStage,
    validation: ValidationPolicy,
    scrubber: Option<PiiScrubber>,
    dedup: Arc<DedupIndex>,
    metrics: Arc<MetricsTracker>,
}

impl Harvester {
    pub fn new(settings: Settings, gateway: Arc<dyn LlmGateway>, dedup: Arc<DedupIndex>) -> Self {
        Self::with_parts(
            settings,
            gateway,
            dedup,
            ExtractorRegistry::with_default_extractors(),
            PromptLibrary::default(),
        )
    }

    pub fn with_parts(
        settings: Settings,
        gateway: Arc<dyn LlmGateway>,
        dedup: Arc<DedupIndex>,
        registry: ExtractorRegistry,
        prompts: PromptLibrary,
    ) -> Self {
        let metrics = Arc::new(MetricsTracker::new());
        let prompts = Arc::new(prompts);
        let scrubber = settings
            .pii_scrubbing_active()
            .then(PiiScrubber::with_asset_vocabulary);

        info!(
            gateway = %gateway.gateway_name(),
            extractors = registry.len(),
            strict = settings.strict_validation,
            "Harvester ready"
        );

        Self {
            classification: ClassificationStage::new(&settings, gateway.clone(), prompts.clone(), metrics.clone()),
            extraction: ExtractionStage::new(&settings, gateway, prompts, metrics.clone()),
            validation: ValidationPolicy::from_settings(&settings),
            registry,
            scrubber,
            dedup,
            metrics,
            settings,
        }
    }

    /// Build the gateway chain and dedup index the settings describe.
    pub fn from_settings(settings: Settings, dry_run: bool) -> Result<Self> {
        settings.validate()?;
        let caches = CacheRegistry::new();
        let gateway = llm::build_gateway(&settings, Some(&caches))?;
        let dedup = match &settings.dedup_history_file {
            Some(path) => DedupIndex::open(path, dry_run),
            None => DedupIndex::in_memory(),
        };
        Ok(Self::new(settings, gateway, Arc::new(dedup)))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn metrics(&self) -> &Arc<MetricsTracker> {
        &self.metrics
    }

    pub fn dedup(&self) -> &Arc<DedupIndex> {
        &self.dedup
    }

    /// Run one email through the whole cascade. Never fails: any model error is
    /// turned into a negative outcome with a note.
    pub async fn process(&self, email: &Email) -> ProcessingOutcome {
        self.metrics.increment("emails_total");

        if self.settings.enable_preprocessing {
            let verdict = preprocess::decide(email);
            if verdict.is_skip() {
                self.metrics.increment("classification_skipped_preprocessing");
                return ProcessingOutcome::no_purchase(format!(
                    "Email not classified as crypto purchase: {}",
                    verdict.reason()
                ));
            }
        }

        let mut notes = Vec::new();
        let candidates = match self.deterministic_candidates(email) {
            Some(candidates) => candidates,
            None => match self.model_candidates(email, &mut notes).await {
                ModelStep::Candidates(candidates) => candidates,
                ModelStep::Stop => {
                    return ProcessingOutcome {
                        processing_notes: notes,
                        ..ProcessingOutcome::default()
                    }
                }
                ModelStep::Failed => {
                    return ProcessingOutcome {
                        processing_notes: notes,
                        model_failed: true,
                        ..ProcessingOutcome::default()
                    }
                }
            },
        };

        let purchases = self.finalize(email, candidates, &mut notes);
        if purchases.is_empty() {
            return ProcessingOutcome {
                processing_notes: notes,
                ..ProcessingOutcome::default()
            };
        }

        self.metrics.add("purchases_extracted", purchases.len() as u64);
        info!("Successfully processed crypto purchase email");
        notes.push(format!(
            "Successfully extracted and validated {} purchase(s)",
            purchases.len()
        ));
        ProcessingOutcome {
            has_purchase: true,
            purchases,
            processing_notes: notes,
            model_failed: false,
        }
    }

    fn deterministic_candidates(&self, email: &Email) -> Option<Vec<RawTransaction>> {
        if !self.settings.enable_regex_extractors {
            return None;
        }
        self.metrics.increment("extraction_regex_attempts");
        let candidates = self.registry.extract(&email.subject, &email.sender, &email.body)?;
        info!("Successfully extracted purchase info using regex extractor");
        self.metrics.increment("extraction_regex_success");
        Some(candidates)
    }

    /// Classification then extraction. On anything but candidates the notes say why.
    async fn model_candidates(&self, email: &Email, notes: &mut Vec<String>) -> ModelStep {
        let mut content = prompts::email_content(email);
        if let Some(scrubber) = &self.scrubber {
            debug!("PII scrubbing enabled, processing email content");
            content = scrubber.scrub(&content);
        }

        let classification = match self.classification.classify(&content).await {
            Ok(classification) => classification,
            Err(e) => {
                error!("Failed to categorize email: {}", e);
                notes.push(format!("LLM classification failed: {}", e));
                return ModelStep::Failed;
            }
        };
        if !self.classification.accepts(&classification) {
            notes.push(format!(
                "Email not classified as crypto purchase: {} (confidence {:.2})",
                classification.reasoning, classification.confidence
            ));
            return ModelStep::Stop;
        }

        let outcome = match self.extraction.extract(&content).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Failed to extract purchase info: {}", e);
                notes.push(format!("LLM extraction failed: {}", e));
                return ModelStep::Failed;
            }
        };
        notes.extend(outcome.notes);

        if outcome.candidates.is_empty() {
            warn!("Failed to extract purchase information despite positive classification");
            notes.push(
                "Classification positive but extraction failed: no structured transaction data found"
                    .to_string(),
            );
            return ModelStep::Stop;
        }
        ModelStep::Candidates(outcome.candidates)
    }

    /// Normalise, validate and deduplicate candidates.
    fn finalize(&self, email: &Email, candidates: Vec<RawTransaction>, notes: &mut Vec<String>) -> Vec<PurchaseRecord> {
        let mut purchases = Vec::new();

        for mut candidate in candidates {
            let label = candidate.item_name.clone().unwrap_or_else(|| "unnamed".to_string());
            notes.extend(normalize_candidate(&mut candidate, &email.date));

            match self.validation.check(&candidate) {
                Checked::Accepted { record, notes: issues } => {
                    notes.extend(issues);
                    if self.dedup.is_duplicate(&record) {
                        info!(vendor = %record.vendor, item = %record.item_name, "Skipping duplicate record");
                        self.metrics.increment("duplicates_skipped");
                        notes.push(format!("Skipped duplicate {} record from {}", record.item_name, record.vendor));
                        continue;
                    }
                    purchases.push(record);
                }
                Checked::Rejected { reasons } => {
                    warn!("Extracted purchase data failed validation");
                    self.metrics.increment("validation_rejected");
                    notes.push(format!(
                        "Extracted data for {} failed validation: {}",
                        label,
                        reasons.join("; ")
                    ));
                }
            }
        }

        purchases
    }

    /// Emails are recorded as seen once handled, unless a model call failed and a later
    /// run should retry them.
    async fn process_and_mark(&self, email: &Email) -> ProcessingOutcome {
        let outcome = self.process(email).await;
        if outcome.model_failed {
            debug!(subject = %email.subject, "Model call failed, email left unmarked for retry");
        } else {
            self.dedup.mark_email(email);
        }
        outcome
    }

    /// Process many emails. Emails already seen are skipped; with parallel processing
    /// enabled at most `max_workers` run at once and results arrive in completion order.
    pub async fn process_batch(
        self: &Arc<Self>,
        emails: Vec<Email>,
        progress: Option<ProgressCallback>,
    ) -> BatchSummary {
        let total = emails.len();
        let completed = Arc::new(AtomicUsize::new(0));
        let tick = |completed: &AtomicUsize| {
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(progress) = &progress {
                progress(done, total);
            }
        };

        let mut summary = BatchSummary::default();
        let mut fresh = Vec::with_capacity(total);
        let mut in_batch = HashSet::with_capacity(total);
        for email in emails {
            if self.dedup.has_seen_email(&email) || !in_batch.insert(email_hash(&email)) {
                info!(subject = %email.subject, "Skipping already processed email");
                summary.emails_skipped_duplicate += 1;
                summary
                    .notes
                    .push(format!("Skipped duplicate email: {}", email.subject));
                tick(&completed);
            } else {
                fresh.push(email);
            }
        }

        if self.settings.enable_parallel_processing && self.settings.max_workers > 1 {
            info!(
                "Processing {} emails with up to {} workers",
                fresh.len(),
                self.settings.max_workers
            );
            let semaphore = Arc::new(Semaphore::new(self.settings.max_workers));
            let mut workers = JoinSet::new();

            for email in fresh {
                let semaphore = semaphore.clone();
                let harvester = Arc::clone(self);
                workers.spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return ProcessingOutcome::no_purchase("Worker pool closed before processing");
                    };
                    harvester.process_and_mark(&email).await
                });
            }

            while let Some(joined) = workers.join_next().await {
                match joined {
                    Ok(outcome) => summary.absorb(outcome),
                    Err(e) => {
                        error!("Email worker failed: {}", e);
                        summary.notes.push(format!("Email worker failed: {}", e));
                    }
                }
                tick(&completed);
            }
        } else {
            let chunk_size = self.settings.batch_size.max(1);
            for (index, chunk) in fresh.chunks(chunk_size).enumerate() {
                debug!("Processing batch {} ({} emails)", index + 1, chunk.len());
                for email in chunk {
                    let outcome = self.process_and_mark(email).await;
                    summary.absorb(outcome);
                    tick(&completed);
                }
            }
        }

        summary.metrics = self.metrics.snapshot();
        info!(
            processed = summary.emails_processed,
            skipped = summary.emails_skipped_duplicate,
            purchases = summary.purchases.len(),
            "Batch complete"
        );
        summary
    }
}

enum ModelStep {
    Candidates(Vec<RawTransaction>),
    /// The model answered but found nothing to record.
    Stop,
    /// A model call errored.
    Failed,
}

/// Canonical transaction type and a UTC date. Returns notes for anything that had to be guessed.
fn normalize_candidate(candidate: &mut RawTransaction, email_date: &str) -> Vec<String> {
    let mut notes = Vec::new();

    let kind = match candidate.transaction_type.as_deref() {
        None => TransactionType::Buy,
        Some(raw) => match TransactionType::parse_lenient(raw) {
            Some(kind) => kind,
            None => {
                warn!("Unknown transaction type '{}', recording as buy", raw);
                notes.push(format!("Unknown transaction type '{}' recorded as buy", raw));
                TransactionType::Buy
            }
        },
    };
    candidate.transaction_type = Some(kind.as_str().to_string());

    let (date, note) = dates::normalize_date(candidate.purchase_date.as_deref(), Some(email_date));
    candidate.purchase_date = Some(date);
    notes.extend(note);

    notes
}
