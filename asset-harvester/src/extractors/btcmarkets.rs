use super::helpers::{find_match, priced_candidate, sender_has, subject_mentions};
use super::{ExtractorError, VendorExtractor};
use crate::types::RawTransaction;
use crate::utils::static_regex;
use regex::Regex;
use std::sync::LazyLock;

const VENDOR: &str = "BTCMarkets";

// "Your buy order for 0.05 BTC has been filled at $60,000.00 AUD"
static FILL: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"(?i)(?:order for|bought)\s+([\d,.]+)\s+([A-Z]{3,5})\s+(?:has been filled at|for)\s+([$€£¥])?([\d,.]+)\s*(?-i:([A-Z]{3}))?",
    )
});
static ORDER_ID: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)Order\s*ID\s*:?\s*([A-Z0-9\-]+)"));

pub struct BtcMarketsExtractor;

impl VendorExtractor for BtcMarketsExtractor {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn can_handle(&self, subject: &str, sender: &str, _body: &str) -> bool {
        sender_has(sender, "btcmarkets.net")
            && (subject_mentions(subject, &["buy order filled", "trade confirmation", "order processed"])
                || sender.to_lowercase().contains("btc markets"))
    }

    fn extract(&self, _subject: &str, _sender: &str, body: &str) -> Result<Vec<RawTransaction>, ExtractorError> {
        Ok(FILL
            .captures(body)
            .and_then(|caps| priced_candidate(VENDOR, &caps, "AUD", "AUD"))
            .map(|candidate| candidate.with_transaction_id(find_match(&ORDER_ID, body, 1)))
            .into_iter()
            .collect())
    }
}
