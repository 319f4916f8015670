use super::helpers::{clean_number, find_match, group, resolve_currency, sender_has};
use super::{ExtractorError, VendorExtractor};
use crate::types::{RawTransaction, TransactionType};
use crate::utils::static_regex;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

const VENDOR: &str = "Kraken";

// "You bought 0.75 XBT (BTC) for $35,000.00 USD."
static BUY: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"(?i)(?:bought|buy)\s+([\d,.]+)\s+([A-Z0-9]+)(?:\s+\([A-Z0-9]+\))?\s+for\s+([$€£¥])?([\d,.]+)\s*(?-i:([A-Z]{3}))?",
    )
});
static STAKING: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        static_regex(r"(?i)credited your account with\s+([\d,.]+)\s+([A-Z0-9]+)"),
        static_regex(r"(?i)staking reward of\s+([\d,.]+)\s+([A-Z0-9]+)"),
        // summary bullets: "* 0.00123 ETH"
        static_regex(r"(?im)[*•-][ \t]+([\d,.]+)[ \t]+([A-Z0-9]+)(?:\s|$)"),
    ]
});
static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)(?:ID|Reference|Order Reference):\s*([A-Z0-9\-]+)"));
static FEE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)Fee:\s*([$€£¥])?([\d,.]+)\s*(?-i:([A-Z]{3}))?"));

/// Kraken's legacy tickers.
fn normalize_ticker(raw: &str) -> String {
    let upper = raw.to_uppercase();
    match upper.as_str() {
        "XBT" => "BTC".to_string(),
        "XDG" => "DOGE".to_string(),
        _ => upper,
    }
}

pub struct KrakenExtractor;

impl KrakenExtractor {
    fn candidate(
        amount: &str,
        symbol: &str,
        total_spent: Option<String>,
        currency: Option<String>,
        body: &str,
    ) -> RawTransaction {
        let (fee_amount, fee_currency) = match FEE.captures(body) {
            Some(caps) => (
                group(&caps, 2).map(|v| clean_number(&v)),
                group(&caps, 3).or_else(|| currency.clone()),
            ),
            None => (None, None),
        };

        RawTransaction::regex(VENDOR, &clean_number(amount), &normalize_ticker(symbol))
            .with_total(total_spent, currency)
            .with_transaction_id(find_match(&REFERENCE, body, 1))
            .with_fee(fee_amount, fee_currency)
    }
}

impl VendorExtractor for KrakenExtractor {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn can_handle(&self, _subject: &str, sender: &str, _body: &str) -> bool {
        sender_has(sender, "kraken.com")
    }

    fn extract(&self, subject: &str, _sender: &str, body: &str) -> Result<Vec<RawTransaction>, ExtractorError> {
        let mut found = Vec::new();

        if let Some(caps) = BUY.captures(body) {
            let currency = resolve_currency(group(&caps, 5), group(&caps, 3), "USD", "USD");
            found.push(Self::candidate(
                &caps[1],
                &caps[2],
                group(&caps, 4).map(|v| clean_number(&v)),
                Some(currency),
                body,
            ));
            return Ok(found);
        }

        let mentions_staking =
            body.to_lowercase().contains("staking") || subject.to_lowercase().contains("staking");
        if !mentions_staking {
            return Ok(found);
        }

        let mut seen = HashSet::new();
        for pattern in STAKING.iter() {
            for caps in pattern.captures_iter(body) {
                let amount = clean_number(&caps[1]);
                let raw_symbol = caps[2].to_uppercase();
                // several patterns can hit the same line
                if !seen.insert((amount.clone(), raw_symbol.clone())) {
                    continue;
                }
                found.push(
                    Self::candidate(&amount, &raw_symbol, None, None, body)
                        .with_type(TransactionType::StakingReward),
                );
            }
        }

        Ok(found)
    }
}
