use super::helpers::{clean_number, group, sender_has, subject_mentions};
use super::{ExtractorError, VendorExtractor};
use crate::types::{RawTransaction, TransactionType};
use crate::utils::static_regex;
use regex::Regex;
use std::sync::LazyLock;

const VENDOR: &str = "Binance";

const SUBJECTS: &[&str] = &[
    "trade confirmation",
    "order to buy",
    "order execution",
    "filled",
    "deposit successful",
    "withdrawal successful",
    "distribution confirmation",
];

static BLOCK_SPLIT: LazyLock<Regex> = LazyLock::new(|| static_regex(r"\n[ \t]*\r?\n"));
static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)Amount:[ \t]*([\d,.]+)(?:[ \t]+(?-i:([A-Z][A-Z0-9]{1,9})))?")
});
static PAIR: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)(?:Trading\s+)?Pair:\s*([A-Z0-9]+)/"));
static TOTAL: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)Total(?:\s+Cost)?:[ \t]*[$€£¥]?([\d,.]+)(?:[ \t]+(?-i:([A-Z][A-Z0-9]{1,9})))?")
});
static PRICE_CURRENCY: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)Price:[ \t]*[$€£¥]?[\d,.]+[ \t]+(?-i:([A-Z][A-Z0-9]{1,9}))")
});
// "Your order to buy 0.1 ETH for 200.00 USD has been filled."
static ONE_LINER: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)buy\s+([\d,.]+)\s+([A-Z]{3,5})\s+for\s+([\d,.]+)\s+(?-i:([A-Z]{3,5}))")
});
// "Your account has been credited with 0.5 SOL for SOL Staking."
static STAKING: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)credited with\s+([\d,.]+)\s+([A-Z]{3,5})"));
static MOVEMENT: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)(deposited|withdrawn)\s+([\d,.]+)\s+([A-Z]{3,5})"));
static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)(?:Transaction ID|Reference|Order\s*#)\s*:?\s*([A-Z0-9#\-]+)")
});
static FEE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?i)Fee:[ \t]*([\d,.]+)(?:[ \t]+(?-i:([A-Z][A-Z0-9]{1,9})))?")
});

pub struct BinanceExtractor;

impl BinanceExtractor {
    /// Reference and fee are looked up in the block first, then in the whole body.
    fn candidate(
        amount: &str,
        symbol: &str,
        total_spent: Option<String>,
        currency: Option<String>,
        context: &str,
        body: &str,
    ) -> RawTransaction {
        let reference = group_in(&REFERENCE, context, 1).or_else(|| group_in(&REFERENCE, body, 1));

        let fee = FEE.captures(context).or_else(|| FEE.captures(body));
        let (fee_amount, fee_currency) = match fee {
            Some(caps) => (
                group(&caps, 1).map(|v| clean_number(&v)),
                group(&caps, 2).map(|c| c.to_uppercase()),
            ),
            None => (None, None),
        };

        RawTransaction::regex(VENDOR, &clean_number(amount), &symbol.to_uppercase())
            .with_total(total_spent, currency)
            .with_transaction_id(reference)
            .with_fee(fee_amount, fee_currency)
    }

    fn order_blocks(body: &str) -> Vec<RawTransaction> {
        if !body.contains("Details:") {
            return vec![];
        }

        let mut found = Vec::new();
        for block in BLOCK_SPLIT.split(body) {
            let priced = block.contains("Price:") || block.contains("Total:") || block.contains("Total Cost:");
            if !block.contains("Amount:") || !priced {
                continue;
            }

            let Some(amount_caps) = AMOUNT.captures(block) else {
                continue;
            };
            let Some(amount) = group(&amount_caps, 1) else {
                continue;
            };
            let symbol = group(&amount_caps, 2).or_else(|| group_in(&PAIR, block, 1));
            let Some(symbol) = symbol else {
                continue;
            };

            let (total_spent, total_currency) = match TOTAL.captures(block) {
                Some(caps) => (group(&caps, 1).map(|v| clean_number(&v)), group(&caps, 2)),
                None => (None, None),
            };
            let currency = total_currency
                .or_else(|| group_in(&PRICE_CURRENCY, block, 1))
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| "USDT".to_string());

            found.push(Self::candidate(&amount, &symbol, total_spent, Some(currency), block, body));
        }
        found
    }
}

fn group_in(re: &Regex, text: &str, index: usize) -> Option<String> {
    re.captures(text).and_then(|caps| group(&caps, index))
}

impl VendorExtractor for BinanceExtractor {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn can_handle(&self, subject: &str, sender: &str, _body: &str) -> bool {
        sender_has(sender, "binance.com") && subject_mentions(subject, SUBJECTS)
    }

    fn extract(&self, _subject: &str, _sender: &str, body: &str) -> Result<Vec<RawTransaction>, ExtractorError> {
        let mut found = Self::order_blocks(body);

        if found.is_empty() {
            if let Some(caps) = ONE_LINER.captures(body) {
                found.push(Self::candidate(
                    &caps[1],
                    &caps[2],
                    Some(clean_number(&caps[3])),
                    Some(caps[4].to_uppercase()),
                    body,
                    body,
                ));
            }
        }

        if found.is_empty() && body.to_lowercase().contains("staking") {
            if let Some(caps) = STAKING.captures(body) {
                found.push(
                    Self::candidate(&caps[1], &caps[2], None, None, body, body)
                        .with_type(TransactionType::StakingReward),
                );
            }
        }

        if found.is_empty() {
            if let Some(caps) = MOVEMENT.captures(body) {
                let kind = if caps[1].eq_ignore_ascii_case("deposited") {
                    TransactionType::Deposit
                } else {
                    TransactionType::Withdrawal
                };
                found.push(Self::candidate(&caps[2], &caps[3], None, None, body, body).with_type(kind));
            }
        }

        Ok(found)
    }
}
