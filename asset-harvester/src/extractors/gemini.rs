use super::helpers::{clean_number, find_match, group, resolve_currency, sender_has};
use super::{ExtractorError, VendorExtractor};
use crate::types::RawTransaction;
use crate::utils::static_regex;
use regex::Regex;
use std::sync::LazyLock;

const VENDOR: &str = "Gemini";

// "Your order to purchase 0.005 BTC for $150.00 has been completed."
static ORDER: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)order to purchase\s+([\d,.]+)\s+([A-Z]{3,5})\s+for\s+([$€£¥])?([\d,.]+)")
});
static TRANSACTION_ID: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)Transaction ID:\s*([A-Z0-9\-]+)"));

pub struct GeminiExtractor;

impl VendorExtractor for GeminiExtractor {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn can_handle(&self, _subject: &str, sender: &str, _body: &str) -> bool {
        sender_has(sender, "gemini.com")
    }

    fn extract(&self, _subject: &str, _sender: &str, body: &str) -> Result<Vec<RawTransaction>, ExtractorError> {
        let Some(caps) = ORDER.captures(body) else {
            return Ok(vec![]);
        };

        let currency = resolve_currency(None, group(&caps, 3), "USD", "USD");
        let candidate = RawTransaction::regex(VENDOR, &clean_number(&caps[1]), &caps[2].to_uppercase())
            .with_total(Some(clean_number(&caps[4])), Some(currency))
            .with_transaction_id(find_match(&TRANSACTION_ID, body, 1));
        Ok(vec![candidate])
    }
}
