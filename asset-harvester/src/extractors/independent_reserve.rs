use super::helpers::{find_match, priced_candidate, sender_has, subject_mentions};
use super::{ExtractorError, VendorExtractor};
use crate::types::{parse_decimal, RawTransaction};
use crate::utils::static_regex;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

const VENDOR: &str = "Independent Reserve";

// "You have successfully bought 0.1 BTC for $5,000.00 AUD"
static PURCHASE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)(?:bought|purchased)\s+([\d,.]+)\s+([A-Z]{3,5})\s+for\s+(\$)?([\d,.]+)\s*(?-i:([A-Z]{3}))?")
});
static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)\b(?:Reference|Ref|Order ID):?\s*([A-Z0-9\-]+)"));

pub struct IndependentReserveExtractor;

impl VendorExtractor for IndependentReserveExtractor {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn can_handle(&self, subject: &str, sender: &str, _body: &str) -> bool {
        sender_has(sender, "independentreserve.com")
            && (subject_mentions(subject, &["trade confirmation", "order filled", "buy order"])
                || sender.to_lowercase().contains("independent reserve"))
    }

    fn extract(&self, _subject: &str, _sender: &str, body: &str) -> Result<Vec<RawTransaction>, ExtractorError> {
        let reference = find_match(&REFERENCE, body, 1);
        let mut found = Vec::new();
        for caps in PURCHASE.captures_iter(body) {
            let Some(candidate) = priced_candidate(VENDOR, &caps, "AUD", "AUD") else {
                continue;
            };
            // unreadable numbers drop just this sentence
            let readable = candidate
                .amount
                .as_deref()
                .map(|v| parse_decimal("amount", v).is_ok())
                .unwrap_or(false)
                && candidate
                    .total_spent
                    .as_deref()
                    .map(|v| parse_decimal("total_spent", v).is_ok())
                    .unwrap_or(true);
            if !readable {
                debug!("Skipping unreadable Independent Reserve amounts: {:?}", &caps[0]);
                continue;
            }
            found.push(candidate.with_transaction_id(reference.clone()));
        }
        Ok(found)
    }
}
