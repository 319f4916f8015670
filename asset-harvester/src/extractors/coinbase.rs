use super::helpers::{clean_number, find_match, group, resolve_currency, sender_has};
use super::{ExtractorError, VendorExtractor};
use crate::types::{RawTransaction, TransactionType};
use crate::utils::static_regex;
use regex::Regex;
use std::sync::LazyLock;

const VENDOR: &str = "Coinbase";

// "You successfully purchased 0.001 BTC for $100.00 USD."
static PURCHASE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)(?:purchased|bought)\s+([\d,.]+)\s+([A-Z]{3,5})\s+for\s+([$€£¥])?([\d,.]+)\s*(?-i:([A-Z]{3}))?")
});
// "Your Coinbase purchase of 0.001 BTC"
static SUBJECT_PURCHASE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)purchase of ([\d,.]+)\s+([A-Z]{3,5})"));
static PRICE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)for\s+([$€£¥])?([\d,.]+)\s*(?-i:([A-Z]{3}))?"));
// "You just earned 0.00001234 ETH in staking rewards!"
static STAKING: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)(?:earned|received)\s+([\d,.]+)\s+([A-Z]{3,5})\s+in\s+staking\s+rewards")
});
static TRANSACTION_ID: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)Transaction ID:\s*([A-Z0-9\-]+)"));
static FEE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)(?:fee of|Coinbase Fee)\s*:?\s*([$€£¥])?([\d,.]+)\s*(?-i:([A-Z]{3}))?")
});

pub struct CoinbaseExtractor;

impl CoinbaseExtractor {
    fn candidate(
        amount: &str,
        symbol: &str,
        total_spent: Option<String>,
        currency: Option<String>,
        body: &str,
    ) -> RawTransaction {
        let (fee_amount, fee_currency) = match FEE.captures(body) {
            Some(caps) => {
                let fee = group(&caps, 2).map(|v| clean_number(&v));
                let code = group(&caps, 3).or_else(|| currency.clone());
                (fee, code)
            }
            None => (None, None),
        };

        RawTransaction::regex(VENDOR, &clean_number(amount), &symbol.to_uppercase())
            .with_total(total_spent, currency)
            .with_transaction_id(find_match(&TRANSACTION_ID, body, 1))
            .with_fee(fee_amount, fee_currency)
    }
}

impl VendorExtractor for CoinbaseExtractor {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn can_handle(&self, _subject: &str, sender: &str, _body: &str) -> bool {
        sender_has(sender, "coinbase.com")
    }

    fn extract(&self, subject: &str, _sender: &str, body: &str) -> Result<Vec<RawTransaction>, ExtractorError> {
        let mut found = Vec::new();

        if let Some(caps) = PURCHASE.captures(body) {
            let currency = resolve_currency(group(&caps, 5), group(&caps, 3), "USD", "USD");
            found.push(Self::candidate(
                &caps[1],
                &caps[2],
                group(&caps, 4).map(|v| clean_number(&v)),
                Some(currency),
                body,
            ));
        } else if let Some(caps) = SUBJECT_PURCHASE.captures(subject) {
            let (total_spent, currency) = match PRICE.captures(body) {
                Some(price) => (
                    group(&price, 2).map(|v| clean_number(&v)),
                    resolve_currency(group(&price, 3), group(&price, 1), "USD", "USD"),
                ),
                None => (None, "USD".to_string()),
            };
            found.push(Self::candidate(&caps[1], &caps[2], total_spent, Some(currency), body));
        }

        if found.is_empty() && body.to_lowercase().contains("staking reward") {
            if let Some(caps) = STAKING.captures(body) {
                found.push(
                    Self::candidate(&caps[1], &caps[2], None, None, body)
                        .with_type(TransactionType::StakingReward),
                );
            }
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_fallback_reads_price_from_body() {
        let found = CoinbaseExtractor
            .extract(
                "Your Coinbase purchase of 0.25 ETH",
                "no-reply@coinbase.com",
                "Thanks! It was paid for €450.00 from your card.",
            )
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].amount.as_deref(), Some("0.25"));
        assert_eq!(found[0].total_spent.as_deref(), Some("450.00"));
        assert_eq!(found[0].currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn fee_currency_defaults_to_purchase_currency() {
        let body = "You bought 0.5 BTC for $30,000.00 USD.\nCoinbase Fee: $1.99\nTransaction ID: CB-123";
        let found = CoinbaseExtractor.extract("", "no-reply@coinbase.com", body).unwrap();
        assert_eq!(found[0].total_spent.as_deref(), Some("30000.00"));
        assert_eq!(found[0].fee_amount.as_deref(), Some("1.99"));
        assert_eq!(found[0].fee_currency.as_deref(), Some("USD"));
        assert_eq!(found[0].transaction_id.as_deref(), Some("CB-123"));
    }
}
