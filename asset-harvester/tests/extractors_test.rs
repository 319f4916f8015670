mod common;

use asset_harvester::extractors::{ExtractorError, ExtractorRegistry, VendorExtractor};
use asset_harvester::{ExtractionMethod, RawTransaction, TransactionType};

#[test]
fn coinbase_buy_is_extracted_deterministically() {
    common::init_tracing();
    let registry = ExtractorRegistry::with_default_extractors();
    let email = common::coinbase_email();

    let found = registry
        .extract(&email.subject, &email.sender, &email.body)
        .expect("coinbase extractor should match");

    assert_eq!(found.len(), 1);
    let candidate = &found[0];
    assert_eq!(candidate.amount.as_deref(), Some("0.001"));
    assert_eq!(candidate.item_name.as_deref(), Some("BTC"));
    assert_eq!(candidate.total_spent.as_deref(), Some("100.00"));
    assert_eq!(candidate.currency.as_deref(), Some("USD"));
    assert_eq!(candidate.vendor.as_deref(), Some("Coinbase"));
    assert_eq!(candidate.extraction_method, Some(ExtractionMethod::Regex));

    // same input, same output
    let again = registry.extract(&email.subject, &email.sender, &email.body);
    assert_eq!(again.as_ref(), Some(&found));
}

#[test]
fn registry_order_is_fixed() {
    let registry = ExtractorRegistry::default();
    assert_eq!(
        registry.vendors(),
        vec![
            "Coinbase",
            "Binance",
            "Kraken",
            "Gemini",
            "Crypto.com",
            "FTX",
            "CoinSpot",
            "Bitfinex",
            "Bitstamp",
            "BTCMarkets",
            "Independent Reserve",
            "Newton",
            "Swyftx",
        ]
    );
}

struct Fixed {
    name: &'static str,
    result: Result<Vec<RawTransaction>, ExtractorError>,
}

impl VendorExtractor for Fixed {
    fn vendor(&self) -> &'static str {
        self.name
    }

    fn can_handle(&self, _subject: &str, _sender: &str, _body: &str) -> bool {
        true
    }

    fn extract(&self, _subject: &str, _sender: &str, _body: &str) -> Result<Vec<RawTransaction>, ExtractorError> {
        self.result.clone()
    }
}

#[test]
fn first_non_empty_match_wins_and_failures_are_skipped() {
    let mut registry = ExtractorRegistry::new();
    registry.register(Box::new(Fixed {
        name: "broken",
        result: Err(ExtractorError::Malformed {
            vendor: "broken",
            message: "boom".to_string(),
        }),
    }));
    registry.register(Box::new(Fixed { name: "empty", result: Ok(vec![]) }));
    registry.register(Box::new(Fixed {
        name: "first",
        result: Ok(vec![RawTransaction::regex("First", "1", "BTC")]),
    }));
    registry.register(Box::new(Fixed {
        name: "second",
        result: Ok(vec![
            RawTransaction::regex("Second", "2", "ETH"),
            RawTransaction::regex("Second", "3", "ETH"),
        ]),
    }));

    let found = registry.extract("s", "x@y.z", "b").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].vendor.as_deref(), Some("First"));
}

#[test]
fn unknown_senders_fall_through() {
    let registry = ExtractorRegistry::default();
    let email = common::unknown_exchange_email("Receipt");
    assert!(registry.extract(&email.subject, &email.sender, &email.body).is_none());
}

#[test]
fn vendor_specific_phrasings() {
    let registry = ExtractorRegistry::default();
    let one = |subject: &str, sender: &str, body: &str| -> RawTransaction {
        let mut found = registry.extract(subject, sender, body).expect("should match");
        assert_eq!(found.len(), 1, "{}", sender);
        found.remove(0)
    };

    let gemini = one(
        "Order confirmation",
        "orders@gemini.com",
        "Your order to purchase 0.005 BTC for $150.00 has been completed.\nTransaction ID: GM-42",
    );
    assert_eq!(gemini.total_spent.as_deref(), Some("150.00"));
    assert_eq!(gemini.transaction_id.as_deref(), Some("GM-42"));

    let cdc = one(
        "Order filled",
        "noreply@crypto.com",
        "Your market order to buy 2.5 SOL has been filled.\nTotal cost: $62.50 USD.\nOrder ID: CDC-77",
    );
    assert_eq!(cdc.item_name.as_deref(), Some("SOL"));
    assert_eq!(cdc.total_spent.as_deref(), Some("62.50"));
    assert_eq!(cdc.transaction_id.as_deref(), Some("CDC-77"));

    let ftx = one("Trade executed", "support@ftx.com", "Amount: 1.2 ETH\nTotal: $3,600.00 USD");
    assert_eq!(ftx.total_spent.as_deref(), Some("3600.00"));

    let bitfinex = one(
        "Exchange Trade Execution",
        "notify@bitfinex.com",
        "SELL 0.5 ETH @ 2500.0 USD on ETH/USD\nOrder ID: 123456",
    );
    assert_eq!(bitfinex.parsed_type(), Some(TransactionType::Withdrawal));
    assert_eq!(bitfinex.total_spent.as_deref(), Some("1250"));
    assert_eq!(bitfinex.confidence, Some(0.98));

    let bitstamp = one(
        "Transaction confirmation",
        "no-reply@bitstamp.net",
        "You have successfully bought 0.5 BTC for 25,000.00 USD\nTransaction ID: BS99",
    );
    assert_eq!(bitstamp.total_spent.as_deref(), Some("25000.00"));
    assert_eq!(bitstamp.transaction_id.as_deref(), Some("BS99"));

    let btcm = one(
        "Buy order filled",
        "support@btcmarkets.net",
        "Your buy order for 0.05 BTC has been filled at $60,000.00\nOrder ID: 778",
    );
    assert_eq!(btcm.currency.as_deref(), Some("AUD"));

    let ir = one(
        "Trade confirmation",
        "trading@independentreserve.com",
        "You have successfully bought 0.1 BTC for $5,000.00 AUD\nReference: IR-5",
    );
    assert_eq!(ir.transaction_id.as_deref(), Some("IR-5"));

    let newton = one(
        "Trade complete",
        "hello@newton.co",
        "You bought 0.1 BTC for $5,000.00\nReference #: NW-1",
    );
    assert_eq!(newton.currency.as_deref(), Some("CAD"));
    assert_eq!(newton.transaction_id.as_deref(), Some("NW-1"));

    let swyftx = one(
        "Order complete",
        "noreply@swyftx.com",
        "You've successfully bought 1.5 ETH for $4,500.00\nReceipt #: SX-12",
    );
    assert_eq!(swyftx.currency.as_deref(), Some("AUD"));
    assert_eq!(swyftx.total_spent.as_deref(), Some("4500.00"));
}

#[test]
fn coinspot_reports_every_purchase() {
    let registry = ExtractorRegistry::default();
    let body = "You have successfully purchased 50 ADA for $25.00 AUD.\n\
                You have successfully purchased 0.01 BTC for $1,000.00.\n\
                Reference: CS-100";
    let found = registry.extract("Order confirmation", "no-reply@coinspot.com.au", body).unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[1].currency.as_deref(), Some("AUD"));
    assert_eq!(found[1].total_spent.as_deref(), Some("1000.00"));
    assert!(found.iter().all(|c| c.transaction_id.as_deref() == Some("CS-100")));
}

#[test]
fn binance_staking_and_deposits_carry_no_fiat() {
    let registry = ExtractorRegistry::default();

    let staking = registry
        .extract(
            "Distribution Confirmation",
            "do-not-reply@binance.com",
            "Your account has been credited with 0.5 SOL for SOL Staking.",
        )
        .unwrap();
    assert_eq!(staking[0].parsed_type(), Some(TransactionType::StakingReward));
    assert_eq!(staking[0].total_spent, None);

    let deposit = registry
        .extract("Deposit Successful", "do-not-reply@binance.com", "You have deposited 0.25 BTC.")
        .unwrap();
    assert_eq!(deposit[0].parsed_type(), Some(TransactionType::Deposit));
    assert!(!deposit[0].missing_fiat());
}
