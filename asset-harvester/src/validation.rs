use crate::assets;
use crate::config::Settings;
use crate::types::{parse_decimal, ExtractionMethod, NumericConversionError, PurchaseRecord, RawTransaction};
use crate::utils::static_regex;
use regex::Regex;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::LazyLock;
use tracing::warn;

static ISO_CURRENCY: LazyLock<Regex> = LazyLock::new(|| static_regex(r"^[A-Z]{3,5}$"));
static ASSET_SYMBOL: LazyLock<Regex> = LazyLock::new(|| static_regex(r"^[A-Z0-9]{2,10}$"));

/// A business-rule violation on an otherwise well-formed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation issue for {}: {}", self.field, self.message)
    }
}

fn optional_decimal(
    field: &'static str,
    value: &Option<String>,
) -> Result<Option<Decimal>, NumericConversionError> {
    value.as_deref().map(|v| parse_decimal(field, v)).transpose()
}

fn upper(value: &Option<String>) -> Option<String> {
    value.as_ref().map(|v| v.trim().to_uppercase()).filter(|v| !v.is_empty())
}

fn build(
    raw: &RawTransaction,
    amount: Option<Decimal>,
    total_spent: Option<Decimal>,
    fee_amount: Option<Decimal>,
) -> PurchaseRecord {
    let item_name = raw.item_name.clone().unwrap_or_default();
    let extraction_method = raw.extraction_method.unwrap_or(ExtractionMethod::Heuristic);
    PurchaseRecord {
        transaction_type: raw.parsed_type().unwrap_or_default(),
        amount,
        asset_id: assets::asset_id(&item_name).map(str::to_string),
        item_name,
        total_spent,
        currency: upper(&raw.currency),
        vendor: raw.vendor.clone().unwrap_or_default(),
        purchase_date: raw.purchase_date.clone().unwrap_or_default(),
        transaction_id: raw.transaction_id.clone(),
        fee_amount,
        fee_currency: upper(&raw.fee_currency),
        confidence: raw
            .confidence
            .unwrap_or_else(|| ExtractionMethod::default_confidence(Some(extraction_method))),
        extraction_method,
        extraction_notes: raw.extraction_notes.clone(),
    }
}

/// Typed record from a candidate. Fails on the first numeric field that does not parse.
pub fn from_raw(raw: &RawTransaction) -> Result<PurchaseRecord, NumericConversionError> {
    let amount = optional_decimal("amount", &raw.amount)?;
    let total_spent = optional_decimal("total_spent", &raw.total_spent)?;
    let fee_amount = optional_decimal("fee_amount", &raw.fee_amount)?;
    Ok(build(raw, amount, total_spent, fee_amount))
}

/// Like [`from_raw`], but unreadable numeric fields are nulled and reported.
pub fn from_raw_lossy(raw: &RawTransaction) -> (PurchaseRecord, Vec<NumericConversionError>) {
    let mut failures = Vec::new();
    let mut keep = |result: Result<Option<Decimal>, NumericConversionError>| match result {
        Ok(value) => value,
        Err(e) => {
            failures.push(e);
            None
        }
    };
    let amount = keep(optional_decimal("amount", &raw.amount));
    let total_spent = keep(optional_decimal("total_spent", &raw.total_spent));
    let fee_amount = keep(optional_decimal("fee_amount", &raw.fee_amount));
    (build(raw, amount, total_spent, fee_amount), failures)
}

/// Business rules over a typed record.
#[derive(Debug, Clone, Copy)]
pub struct PurchaseValidator {
    allow_unknown_crypto: bool,
}

impl PurchaseValidator {
    pub fn new(allow_unknown_crypto: bool) -> Self {
        Self { allow_unknown_crypto }
    }

    pub fn validate(&self, record: &PurchaseRecord) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        match record.amount {
            None => issues.push(ValidationIssue::new("amount", "is required")),
            Some(amount) if amount <= Decimal::ZERO => {
                issues.push(ValidationIssue::new("amount", "must be greater than zero"))
            }
            Some(_) => {}
        }
        if matches!(record.total_spent, Some(total) if total <= Decimal::ZERO) {
            issues.push(ValidationIssue::new("total_spent", "must be greater than zero"));
        }
        if matches!(record.fee_amount, Some(fee) if fee < Decimal::ZERO) {
            issues.push(ValidationIssue::new("fee_amount", "must be non-negative"));
        }

        if let Some(currency) = &record.currency {
            if !ISO_CURRENCY.is_match(currency) {
                issues.push(ValidationIssue::new("currency", "must be ISO 4217 uppercase code"));
            }
        }
        if let Some(fee_currency) = &record.fee_currency {
            if !ISO_CURRENCY.is_match(fee_currency) && !ASSET_SYMBOL.is_match(fee_currency) {
                issues.push(ValidationIssue::new(
                    "fee_currency",
                    "must be valid currency code or symbol",
                ));
            }
        }

        if record.item_name.trim().is_empty() {
            issues.push(ValidationIssue::new("item_name", "is required"));
        } else if !self.allow_unknown_crypto && !assets::is_known(&record.item_name) {
            issues.push(ValidationIssue::new("item_name", "unknown cryptocurrency"));
        }
        if record.vendor.trim().is_empty() {
            issues.push(ValidationIssue::new("vendor", "is required"));
        }
        if record.purchase_date.trim().is_empty() {
            issues.push(ValidationIssue::new("purchase_date", "is required"));
        }
        if !(0.0..=1.0).contains(&record.confidence) {
            issues.push(ValidationIssue::new("confidence", "must be within [0, 1]"));
        }

        issues
    }
}

impl Default for PurchaseValidator {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Outcome of checking one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Checked {
    Accepted { record: PurchaseRecord, notes: Vec<String> },
    Rejected { reasons: Vec<String> },
}

/// How strictly candidates are held to the rules.
///
/// A numeric failure rejects when either `strict` or `require_numeric` is set; otherwise
/// the field is nulled and noted. Business-rule issues reject only under `strict`.
#[derive(Debug, Clone, Copy)]
pub struct ValidationPolicy {
    pub enabled: bool,
    pub strict: bool,
    pub require_numeric: bool,
    pub validator: PurchaseValidator,
}

impl ValidationPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            enabled: settings.enable_validation,
            strict: settings.strict_validation,
            require_numeric: settings.require_numeric_validation,
            validator: PurchaseValidator::new(settings.allow_unknown_cryptos),
        }
    }

    pub fn check(&self, raw: &RawTransaction) -> Checked {
        let mut notes = Vec::new();

        let record = match from_raw(raw) {
            Ok(record) => record,
            Err(e) if self.strict || self.require_numeric => {
                warn!("Purchase record failed numeric conversion: {}", e);
                return Checked::Rejected {
                    reasons: vec![e.to_string()],
                };
            }
            Err(_) => {
                let (record, failures) = from_raw_lossy(raw);
                for failure in failures {
                    warn!("Nulling unreadable field: {}", failure);
                    notes.push(failure.to_string());
                }
                record
            }
        };

        if !self.enabled {
            return Checked::Accepted { record, notes };
        }

        let issues = self.validator.validate(&record);
        for issue in &issues {
            warn!(field = issue.field, "{}", issue);
        }
        if !issues.is_empty() && self.strict {
            return Checked::Rejected {
                reasons: issues.iter().map(ToString::to_string).collect(),
            };
        }

        notes.extend(issues.iter().map(ToString::to_string));
        Checked::Accepted { record, notes }
    }
}
