use super::helpers::{clean_number, group, resolve_currency, sender_has, subject_mentions};
use super::{ExtractorError, VendorExtractor};
use crate::types::RawTransaction;
use crate::utils::static_regex;
use regex::Regex;
use std::sync::LazyLock;

const VENDOR: &str = "FTX";

static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)Amount:\s*([\d,.]+)\s+([A-Z]{3,5})"));
static TOTAL: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)Total:\s*([$€£¥])?([\d,.]+)\s*(?-i:([A-Z]{3}))?"));

pub struct FtxExtractor;

impl VendorExtractor for FtxExtractor {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn can_handle(&self, subject: &str, sender: &str, _body: &str) -> bool {
        sender_has(sender, "ftx.com") && subject_mentions(subject, &["trade executed", "buy"])
    }

    fn extract(&self, _subject: &str, _sender: &str, body: &str) -> Result<Vec<RawTransaction>, ExtractorError> {
        let (Some(amount), Some(total)) = (AMOUNT.captures(body), TOTAL.captures(body)) else {
            return Ok(vec![]);
        };

        let currency = resolve_currency(group(&total, 3), group(&total, 1), "USD", "USD");
        Ok(vec![
            RawTransaction::regex(VENDOR, &clean_number(&amount[1]), &amount[2].to_uppercase())
                .with_total(Some(clean_number(&total[2])), Some(currency)),
        ])
    }
}
