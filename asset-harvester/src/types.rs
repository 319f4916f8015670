use crate::config::ConfigError;
use crate::llm::error::LlmError;
use interfaces::defs::RecordFields;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of movement a record documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    #[default]
    Buy,
    Deposit,
    Withdrawal,
    StakingReward,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => "buy",
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::StakingReward => "staking_reward",
        }
    }

    /// Map the spellings models and extractors actually produce onto the four kinds.
    pub fn parse_lenient(value: &str) -> Option<Self> {
        let normalized = value.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "buy" | "purchase" | "bought" | "trade" => Some(TransactionType::Buy),
            "deposit" | "receive" | "received" => Some(TransactionType::Deposit),
            "withdrawal" | "withdraw" | "sell" | "sold" => Some(TransactionType::Withdrawal),
            "staking_reward" | "staking" | "reward" | "staking_rewards" => {
                Some(TransactionType::StakingReward)
            }
            _ => None,
        }
    }

    /// Deposits, withdrawals and rewards carry no fiat side.
    pub fn requires_fiat(&self) -> bool {
        matches!(self, TransactionType::Buy)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of a record. Always set by the producer, never read from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Regex,
    Heuristic,
    Llm,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Regex => "regex",
            ExtractionMethod::Heuristic => "heuristic",
            ExtractionMethod::Llm => "llm",
        }
    }

    /// Confidence assigned when the producer did not supply one.
    pub fn default_confidence(method: Option<ExtractionMethod>) -> f64 {
        match method {
            Some(ExtractionMethod::Regex) => 0.95,
            Some(ExtractionMethod::Heuristic) => 0.8,
            Some(ExtractionMethod::Llm) => 0.7,
            None => 0.5,
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction candidate before validation. Every field is optional text so that
/// whatever an extractor or model produced can be carried to the validator as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(default, deserialize_with = "lenient_string")]
    pub transaction_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub item_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub total_spent: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub vendor: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub purchase_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub transaction_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub fee_amount: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub fee_currency: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub extraction_notes: Option<String>,
    #[serde(skip)]
    pub extraction_method: Option<ExtractionMethod>,
}

impl RawTransaction {
    /// Candidate produced by a deterministic extractor.
    pub fn regex(vendor: &str, amount: &str, item_name: &str) -> Self {
        Self {
            amount: Some(amount.to_string()),
            item_name: Some(item_name.to_string()),
            vendor: Some(vendor.to_string()),
            extraction_method: Some(ExtractionMethod::Regex),
            ..Default::default()
        }
    }

    pub fn with_total(mut self, total_spent: Option<String>, currency: Option<String>) -> Self {
        self.total_spent = total_spent;
        self.currency = currency;
        self
    }

    pub fn with_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type.as_str().to_string());
        self
    }

    pub fn with_transaction_id(mut self, transaction_id: Option<String>) -> Self {
        self.transaction_id = transaction_id;
        self
    }

    pub fn with_fee(mut self, fee_amount: Option<String>, fee_currency: Option<String>) -> Self {
        self.fee_amount = fee_amount;
        self.fee_currency = fee_currency;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn parsed_type(&self) -> Option<TransactionType> {
        self.transaction_type.as_deref().and_then(TransactionType::parse_lenient)
    }

    /// Required fields that are absent.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.amount.is_none() {
            missing.push("amount");
        }
        if self.item_name.is_none() {
            missing.push("item_name");
        }
        if self.vendor.is_none() {
            missing.push("vendor");
        }
        missing
    }

    /// A buy without its fiat side is kept but worth a note.
    pub fn missing_fiat(&self) -> bool {
        let requires_fiat = self.parsed_type().unwrap_or_default().requires_fiat();
        requires_fiat && (self.total_spent.is_none() || self.currency.is_none())
    }
}

fn scalar_to_text(value: Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    };
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") || trimmed.eq_ignore_ascii_case("null")
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(scalar_to_text))
}

fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(other) => scalar_to_text(other).and_then(|s| s.parse::<f64>().ok()),
        None => None,
    })
}

/// A validated digital-asset transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub transaction_type: TransactionType,
    pub amount: Option<Decimal>,
    pub item_name: String,
    pub total_spent: Option<Decimal>,
    pub currency: Option<String>,
    pub vendor: String,
    pub purchase_date: String,
    pub transaction_id: Option<String>,
    pub fee_amount: Option<Decimal>,
    pub fee_currency: Option<String>,
    pub confidence: f64,
    pub extraction_method: ExtractionMethod,
    pub extraction_notes: Option<String>,
    pub asset_id: Option<String>,
}

impl PurchaseRecord {
    /// Plain field mapping for exporters. Optional fields are present as null.
    pub fn to_fields(&self) -> RecordFields {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => RecordFields::new(),
        }
    }
}

/// Result of running one email through the pipeline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingOutcome {
    pub has_purchase: bool,
    pub purchases: Vec<PurchaseRecord>,
    pub processing_notes: Vec<String>,
    /// A model call failed, so a later run may do better. Such emails are not
    /// recorded in the dedup history.
    #[serde(skip)]
    pub model_failed: bool,
}

impl ProcessingOutcome {
    pub fn no_purchase(note: impl Into<String>) -> Self {
        Self {
            processing_notes: vec![note.into()],
            ..Self::default()
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not convert {field} value '{value}' to a decimal")]
pub struct NumericConversionError {
    pub field: &'static str,
    pub value: String,
}

/// Parse a decimal field, tolerating thousands separators and currency symbols.
pub fn parse_decimal(field: &'static str, value: &str) -> std::result::Result<Decimal, NumericConversionError> {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '€' | '£' | '¥' | ' '))
        .collect();
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| NumericConversionError {
            field,
            value: value.to_string(),
        })
}

#[derive(Error, Debug)]
pub enum HarvesterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Numeric conversion error: {0}")]
    NumericConversion(#[from] NumericConversionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HarvesterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_transaction_accepts_numbers_and_null_strings() {
        let raw: RawTransaction = serde_json::from_value(serde_json::json!({
            "amount": 0.5,
            "item_name": "ETH",
            "total_spent": "1,500.00",
            "currency": "null",
            "vendor": " Kraken ",
            "confidence": "0.9",
            "extraction_method": "regex"
        }))
        .unwrap();

        assert_eq!(raw.amount.as_deref(), Some("0.5"));
        assert_eq!(raw.currency, None);
        assert_eq!(raw.vendor.as_deref(), Some("Kraken"));
        assert_eq!(raw.confidence, Some(0.9));
        // provenance is never taken from content
        assert_eq!(raw.extraction_method, None);
    }

    #[test]
    fn decimal_parsing_strips_separators() {
        assert_eq!(parse_decimal("amount", "35,000.00").unwrap(), Decimal::new(3500000, 2));
        assert!(parse_decimal("amount", "lots").is_err());
    }

    #[test]
    fn deposits_do_not_require_fiat() {
        let deposit = RawTransaction::regex("Binance", "0.1", "BTC").with_type(TransactionType::Deposit);
        assert!(deposit.missing_fields().is_empty());
        assert!(!deposit.missing_fiat());

        let buy = RawTransaction::regex("Binance", "0.1", "BTC");
        assert!(buy.missing_fiat());

        let nameless = RawTransaction { vendor: None, ..buy };
        assert_eq!(nameless.missing_fields(), vec!["vendor"]);
    }
}
