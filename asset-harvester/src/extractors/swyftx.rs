use super::helpers::{find_match, priced_candidate, sender_has};
use super::{ExtractorError, VendorExtractor};
use crate::types::RawTransaction;
use crate::utils::static_regex;
use regex::Regex;
use std::sync::LazyLock;

const VENDOR: &str = "Swyftx";

// "You've successfully bought 1.5 ETH for $4,500.00 AUD"
static BOUGHT: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)bought\s+([\d,.]+)\s+([A-Z]{3,5})\s+for\s+([$€£¥])?([\d,.]+)\s*(?-i:([A-Z]{3}))?")
});
static RECEIPT: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)Receipt\s*(?:#\s*:?|:)\s*([A-Z0-9\-]+)"));

pub struct SwyftxExtractor;

impl VendorExtractor for SwyftxExtractor {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn can_handle(&self, _subject: &str, sender: &str, _body: &str) -> bool {
        sender_has(sender, "swyftx.com")
    }

    fn extract(&self, _subject: &str, _sender: &str, body: &str) -> Result<Vec<RawTransaction>, ExtractorError> {
        Ok(BOUGHT
            .captures(body)
            .and_then(|caps| priced_candidate(VENDOR, &caps, "AUD", "AUD"))
            .map(|candidate| candidate.with_transaction_id(find_match(&RECEIPT, body, 1)))
            .into_iter()
            .collect())
    }
}
