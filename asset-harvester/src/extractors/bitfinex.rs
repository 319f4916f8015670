use super::helpers::{clean_number, find_match, sender_has, subject_mentions};
use super::{ExtractorError, VendorExtractor};
use crate::types::{RawTransaction, TransactionType};
use crate::utils::static_regex;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

const VENDOR: &str = "Bitfinex";

// "Exchange Trade Execution - BUY 0.5 ETH @ 2500.0 USD on ETH/USD"
static EXECUTION: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)\b(BUY|SELL)\s+([\d,.]+)\s+([A-Z]{3,5})\s+@\s+([\d,.]+)\s+([A-Z]{3,5})")
});
static ORDER_ID: LazyLock<Regex> = LazyLock::new(|| static_regex(r"(?i)Order\s*ID\s*:?\s*(\d+)"));

fn decimal(value: &str) -> Result<Decimal, ExtractorError> {
    Decimal::from_str(value).map_err(|_| ExtractorError::Numeric {
        vendor: VENDOR,
        value: value.to_string(),
    })
}

pub struct BitfinexExtractor;

impl VendorExtractor for BitfinexExtractor {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn can_handle(&self, subject: &str, sender: &str, _body: &str) -> bool {
        sender_has(sender, "bitfinex.com") && subject_mentions(subject, &["trade execution"])
    }

    fn extract(&self, subject: &str, _sender: &str, body: &str) -> Result<Vec<RawTransaction>, ExtractorError> {
        let text = if body.trim().is_empty() { subject } else { body };
        let Some(caps) = EXECUTION.captures(text) else {
            return Ok(vec![]);
        };

        let amount = clean_number(&caps[2]);
        let price = clean_number(&caps[4]);
        let total = decimal(&amount)?
            .checked_mul(decimal(&price)?)
            .ok_or_else(|| ExtractorError::Numeric {
                vendor: VENDOR,
                value: format!("{} x {}", amount, price),
            })?;

        // sales leave the account, so they are booked as withdrawals
        let kind = if caps[1].eq_ignore_ascii_case("buy") {
            TransactionType::Buy
        } else {
            TransactionType::Withdrawal
        };

        Ok(vec![
            RawTransaction::regex(VENDOR, &amount, &caps[3].to_uppercase())
                .with_total(Some(total.normalize().to_string()), Some(caps[5].to_uppercase()))
                .with_type(kind)
                .with_transaction_id(find_match(&ORDER_ID, body, 1))
                .with_confidence(0.98),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_quantity_times_price() {
        let found = BitfinexExtractor
            .extract(
                "Exchange Trade Execution - BUY 0.5 ETH @ 2500.0 USD on ETH/USD",
                "support@bitfinex.com",
                "",
            )
            .unwrap();
        assert_eq!(found[0].total_spent.as_deref(), Some("1250"));
        assert_eq!(found[0].currency.as_deref(), Some("USD"));
        assert_eq!(found[0].confidence, Some(0.98));
    }

    #[test]
    fn garbled_numbers_fail_the_extractor() {
        let err = BitfinexExtractor
            .extract("Trade Execution", "support@bitfinex.com", "SELL 1.2.3 BTC @ 60000 USD")
            .unwrap_err();
        assert!(matches!(err, ExtractorError::Numeric { .. }));
    }

    #[test]
    fn overflowing_total_fails_the_extractor() {
        let err = BitfinexExtractor
            .extract(
                "Trade Execution",
                "support@bitfinex.com",
                "BUY 50000000000000000000000000000 BTC @ 2 USD",
            )
            .unwrap_err();
        assert!(matches!(err, ExtractorError::Numeric { .. }));
    }
}
