use super::helpers::{clean_number, find_match, sender_has, subject_mentions};
use super::{ExtractorError, VendorExtractor};
use crate::types::{RawTransaction, TransactionType};
use crate::utils::static_regex;
use regex::Regex;
use std::sync::LazyLock;

const VENDOR: &str = "Bitstamp";

// "You have successfully bought 0.5 BTC for 25,000.00 USD"
static TRADE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)successfully\s+(bought|sold)\s+([\d,.]+)\s+([A-Z]{3,5})\s+for\s+([\d,.]+)\s+([A-Z]{3})")
});
static TRANSACTION_ID: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)Transaction\s*ID\s*:?\s*([A-Z0-9]+)"));

pub struct BitstampExtractor;

impl VendorExtractor for BitstampExtractor {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn can_handle(&self, subject: &str, sender: &str, _body: &str) -> bool {
        sender_has(sender, "bitstamp.net")
            && subject_mentions(subject, &["transaction confirmation", "bought", "sold"])
    }

    fn extract(&self, _subject: &str, _sender: &str, body: &str) -> Result<Vec<RawTransaction>, ExtractorError> {
        let transaction_id = find_match(&TRANSACTION_ID, body, 1);
        Ok(TRADE
            .captures_iter(body)
            .map(|caps| {
                let kind = if caps[1].eq_ignore_ascii_case("bought") {
                    TransactionType::Buy
                } else {
                    TransactionType::Withdrawal
                };
                RawTransaction::regex(VENDOR, &clean_number(&caps[2]), &caps[3].to_uppercase())
                    .with_total(Some(clean_number(&caps[4])), Some(caps[5].to_uppercase()))
                    .with_type(kind)
                    .with_transaction_id(transaction_id.clone())
                    .with_confidence(0.98)
            })
            .collect())
    }
}
