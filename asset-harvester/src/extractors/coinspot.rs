use super::helpers::{find_match, priced_candidate, sender_has};
use super::{ExtractorError, VendorExtractor};
use crate::types::RawTransaction;
use crate::utils::static_regex;
use regex::Regex;
use std::sync::LazyLock;

const VENDOR: &str = "CoinSpot";

// "You have successfully purchased 50 ADA for $25.00 AUD."
static PURCHASE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)purchased\s+([\d,.]+)\s+([A-Z0-9]+)\s+for\s+([$€£¥])?([\d,.]+)\s*(?-i:([A-Z]{3}))?")
});
static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)Reference:\s*([A-Z0-9\-]+)"));

/// Australian exchange: `$` means AUD.
pub struct CoinSpotExtractor;

impl VendorExtractor for CoinSpotExtractor {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn can_handle(&self, _subject: &str, sender: &str, _body: &str) -> bool {
        sender_has(sender, "coinspot.com")
    }

    fn extract(&self, _subject: &str, _sender: &str, body: &str) -> Result<Vec<RawTransaction>, ExtractorError> {
        let reference = find_match(&REFERENCE, body, 1);
        Ok(PURCHASE
            .captures_iter(body)
            .filter_map(|caps| priced_candidate(VENDOR, &caps, "AUD", "AUD"))
            .map(|candidate| candidate.with_transaction_id(reference.clone()))
            .collect())
    }
}
