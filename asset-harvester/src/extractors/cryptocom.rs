use super::helpers::{clean_number, find_match, group, resolve_currency, sender_has, subject_mentions};
use super::{ExtractorError, VendorExtractor};
use crate::types::RawTransaction;
use crate::utils::static_regex;
use regex::Regex;
use std::sync::LazyLock;

const VENDOR: &str = "Crypto.com";

// "Your market order to buy 2.5 SOL has been filled at a price of $25.00 per SOL."
static BUY: LazyLock<Regex> = LazyLock::new(|| static_regex(r"(?i)buy\s+([\d,.]+)\s+([A-Z]{3,5})"));
// "Total cost: $62.50 USD."
static TOTAL: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)Total cost:\s*([$€£¥])?([\d,.]+)\s*(?-i:([A-Z]{3}))?")
});
// requires a marker after "order" so prose like "order to buy" is not read as an id
static ORDER_ID: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)order\s*(?:#|id\s*:?|number\s*:?)\s*([A-Z0-9\-]+)")
});

pub struct CryptoComExtractor;

impl VendorExtractor for CryptoComExtractor {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn can_handle(&self, subject: &str, sender: &str, _body: &str) -> bool {
        sender_has(sender, "crypto.com") && subject_mentions(subject, &["order", "executed", "buy", "filled"])
    }

    fn extract(&self, _subject: &str, _sender: &str, body: &str) -> Result<Vec<RawTransaction>, ExtractorError> {
        let (Some(buy), Some(total)) = (BUY.captures(body), TOTAL.captures(body)) else {
            return Ok(vec![]);
        };

        let currency = resolve_currency(group(&total, 3), group(&total, 1), "USD", "USD");
        let candidate = RawTransaction::regex(VENDOR, &clean_number(&buy[1]), &buy[2].to_uppercase())
            .with_total(Some(clean_number(&total[2])), Some(currency))
            .with_transaction_id(find_match(&ORDER_ID, body, 1));
        Ok(vec![candidate])
    }
}
