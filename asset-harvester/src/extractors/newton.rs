use super::helpers::{find_match, priced_candidate, sender_has};
use super::{ExtractorError, VendorExtractor};
use crate::types::RawTransaction;
use crate::utils::static_regex;
use regex::Regex;
use std::sync::LazyLock;

const VENDOR: &str = "Newton";

// "You bought 0.1 BTC for $5,000.00 CAD"
static BOUGHT: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)bought\s+([\d,.]+)\s+([A-Z]{3,5})\s+for\s+([$€£¥])?([\d,.]+)\s*(?-i:([A-Z]{3}))?")
});
static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)Reference\s*(?:#\s*:?|:)\s*([A-Z0-9\-]+)"));

/// Canadian exchange: `$` means CAD.
pub struct NewtonExtractor;

impl VendorExtractor for NewtonExtractor {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn can_handle(&self, _subject: &str, sender: &str, _body: &str) -> bool {
        sender_has(sender, "newton.co")
    }

    fn extract(&self, _subject: &str, _sender: &str, body: &str) -> Result<Vec<RawTransaction>, ExtractorError> {
        Ok(BOUGHT
            .captures(body)
            .and_then(|caps| priced_candidate(VENDOR, &caps, "CAD", "CAD"))
            .map(|candidate| candidate.with_transaction_id(find_match(&REFERENCE, body, 1)))
            .into_iter()
            .collect())
    }
}
