mod common;

use asset_harvester::llm::MockBackend;
use asset_harvester::prompts::{self, PromptLibrary};
use asset_harvester::{
    DedupIndex, ExtractorRegistry, Harvester, ProgressCallback, ProviderError, Settings, TransactionType,
};
use interfaces::Email;
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn positive() -> serde_json::Value {
    json!({"is_crypto_purchase": true, "confidence": 0.9, "reasoning": "order confirmation"})
}

fn negative() -> serde_json::Value {
    json!({"is_crypto_purchase": false, "confidence": 0.95, "reasoning": "no transaction"})
}

#[tokio::test]
async fn known_vendor_is_handled_without_the_model() {
    common::init_tracing();
    let backend = common::scripted_backend(positive(), json!({"transactions": []}));
    let harvester = common::harvester(common::test_settings(), backend.clone());

    let outcome = harvester.process(&common::coinbase_email()).await;

    assert!(outcome.has_purchase, "{:?}", outcome.processing_notes);
    assert_eq!(backend.call_count(), 0);
    let record = &outcome.purchases[0];
    assert_eq!(record.transaction_type, TransactionType::Buy);
    assert_eq!(record.amount, Some(Decimal::from_str("0.001").unwrap()));
    assert_eq!(record.item_name, "BTC");
    assert_eq!(record.total_spent, Some(Decimal::from_str("100.00").unwrap()));
    assert_eq!(record.currency.as_deref(), Some("USD"));
    assert_eq!(record.vendor, "Coinbase");
    assert_eq!(record.purchase_date, "2024-01-15 10:30:00 UTC");
    assert_eq!(record.asset_id.as_deref(), Some("bitcoin"));
    assert_eq!(harvester.metrics().get("extraction_regex_success"), 1);
}

#[tokio::test]
async fn marketing_mail_is_skipped_by_the_keyword_gate() {
    let backend = common::scripted_backend(positive(), json!({"transactions": []}));
    let harvester = common::harvester(common::test_settings(), backend.clone());
    let newsletter = Email::new(
        "Your weekly crypto newsletter",
        "news@coinbase.com",
        "Mon, 15 Jan 2024 10:30:00 +0000",
        "Bitcoin rallied this week. Read our market update.",
    );

    let outcome = harvester.process(&newsletter).await;

    assert!(!outcome.has_purchase);
    assert!(outcome.processing_notes[0].starts_with("Email not classified as crypto purchase"));
    assert_eq!(backend.call_count(), 0);
    assert_eq!(harvester.metrics().get("classification_skipped_preprocessing"), 1);
}

#[tokio::test]
async fn unparseable_model_output_becomes_a_note() {
    let backend = Arc::new(MockBackend::new("garbled").with_default_reply("Sure! It looks like a purchase."));
    let harvester = common::harvester(common::test_settings(), backend.clone());

    let outcome = harvester.process(&common::unknown_exchange_email("Receipt")).await;

    assert!(!outcome.has_purchase);
    assert!(outcome.purchases.is_empty());
    assert!(
        outcome.processing_notes.iter().any(|n| n.starts_with("LLM classification failed")),
        "{:?}",
        outcome.processing_notes
    );
    assert_eq!(backend.call_count(), 3);
    assert_eq!(harvester.metrics().get("llm_calls_failed"), 1);
}

#[tokio::test]
async fn unsure_classification_stops_before_extraction() {
    let backend = common::scripted_backend(
        json!({"is_crypto_purchase": true, "confidence": 0.4, "reasoning": "might be a receipt"}),
        json!({"transactions": [{"amount": "1", "item_name": "ETH", "vendor": "X"}]}),
    );
    let harvester = common::harvester(common::test_settings(), backend.clone());

    let outcome = harvester.process(&common::unknown_exchange_email("Receipt")).await;

    assert!(!outcome.has_purchase);
    assert_eq!(backend.call_count(), 1);
    assert!(outcome.processing_notes[0].contains("might be a receipt"));
}

#[tokio::test]
async fn model_extraction_returns_every_complete_transaction() {
    let backend = common::scripted_backend(
        positive(),
        json!({"transactions": [
            {
                "transaction_type": "buy",
                "amount": "0.5",
                "item_name": "ETH",
                "total_spent": "1200.00",
                "currency": "EUR",
                "vendor": "Example Exchange",
                "purchase_date": "2024-01-16T08:00:00Z",
                "transaction_id": "EX-9921-1"
            },
            {
                "amount": 100,
                "item_name": "ADA",
                "total_spent": 40,
                "currency": "eur",
                "vendor": "Example Exchange",
                "transaction_id": "EX-9921-2"
            },
            {"item_name": "SOL", "vendor": "Example Exchange"}
        ]}),
    );
    let harvester = common::harvester(common::test_settings(), backend.clone());

    let outcome = harvester.process(&common::unknown_exchange_email("Order complete")).await;

    assert!(outcome.has_purchase, "{:?}", outcome.processing_notes);
    assert_eq!(backend.call_count(), 2);
    assert_eq!(outcome.purchases.len(), 2);

    let eth = &outcome.purchases[0];
    assert_eq!(eth.purchase_date, "2024-01-16 08:00:00 UTC");
    assert_eq!(eth.confidence, 0.7);

    let ada = &outcome.purchases[1];
    assert_eq!(ada.currency.as_deref(), Some("EUR"));
    assert_eq!(ada.amount, Some(Decimal::from(100)));
    // no date in the payload, so the email's Date header is used
    assert_eq!(ada.purchase_date, "2024-01-16 08:00:00 UTC");

    assert!(outcome
        .processing_notes
        .iter()
        .any(|n| n.contains("Dropped candidate missing amount")));
}

#[tokio::test]
async fn unreadable_amounts_are_rejected_when_strict() {
    let extraction = json!({"transactions": [{
        "amount": "about half",
        "item_name": "ETH",
        "total_spent": "1200",
        "currency": "EUR",
        "vendor": "Example Exchange"
    }]});

    let strict = common::harvester(common::test_settings(), common::scripted_backend(positive(), extraction.clone()));
    let outcome = strict.process(&common::unknown_exchange_email("Receipt")).await;
    assert!(!outcome.has_purchase);
    assert!(outcome.processing_notes.iter().any(|n| n.contains("failed validation")));
    assert_eq!(strict.metrics().get("validation_rejected"), 1);

    let lenient_settings = Settings {
        strict_validation: false,
        require_numeric_validation: false,
        ..common::test_settings()
    };
    let lenient = common::harvester(lenient_settings, common::scripted_backend(positive(), extraction));
    let outcome = lenient.process(&common::unknown_exchange_email("Receipt")).await;
    assert!(outcome.has_purchase, "{:?}", outcome.processing_notes);
    assert_eq!(outcome.purchases[0].amount, None);
    assert_eq!(outcome.purchases[0].total_spent, Some(Decimal::from(1200)));
}

#[tokio::test]
async fn the_same_purchase_reported_twice_is_kept_once() {
    let transaction = |vendor: &str| {
        json!({"transactions": [{
            "amount": "0.5",
            "item_name": "ETH",
            "total_spent": "1200.00",
            "currency": "EUR",
            "vendor": vendor,
            "purchase_date": "2024-01-16 08:00:00"
        }]})
    };
    let backend = Arc::new(
        MockBackend::new("queued")
            .with_json(positive())
            .with_json(transaction("Example Exchange"))
            .with_json(positive())
            .with_json(transaction("  example EXCHANGE")),
    );
    let harvester = common::harvester(common::test_settings(), backend);

    let emails = vec![
        common::unknown_exchange_email("Receipt"),
        common::unknown_exchange_email("Fwd: Receipt"),
    ];
    let summary = harvester.process_batch(emails, None).await;

    assert_eq!(summary.emails_processed, 2);
    assert_eq!(summary.purchases.len(), 1);
    assert_eq!(summary.metrics.get("duplicates_skipped"), Some(&1.0));
    assert!(summary.notes.iter().any(|n| n.starts_with("Skipped duplicate ETH record")));
}

#[tokio::test]
async fn parallel_batches_respect_the_worker_limit_and_report_progress() {
    let settings = Settings {
        enable_parallel_processing: true,
        max_workers: 3,
        ..common::test_settings()
    };
    let backend = Arc::new(
        MockBackend::new("slow")
            .with_delay(20)
            .with_default_reply(negative().to_string()),
    );
    let harvester = common::harvester(settings, backend.clone());

    let mut emails: Vec<Email> = (0..5)
        .map(|i| common::unknown_exchange_email(&format!("Receipt {}", i)).with_message_id(format!("<m{}@x>", i)))
        .collect();
    emails.push(common::unknown_exchange_email("Receipt again").with_message_id("<m0@x>"));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let progress: ProgressCallback = Arc::new(move |done, total| {
        assert_eq!(total, 6);
        recorder.lock().unwrap().push(done);
    });

    let summary = harvester.process_batch(emails, Some(progress)).await;

    assert_eq!(summary.emails_processed, 5);
    assert_eq!(summary.emails_skipped_duplicate, 1);
    assert!(summary.purchases.is_empty());
    assert_eq!(backend.call_count(), 5);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn personal_data_never_reaches_the_model() {
    let settings = Settings {
        enable_pii_scrubbing: true,
        ..common::test_settings()
    };
    let backend = common::scripted_backend(negative(), json!({"transactions": []}));
    let harvester = common::harvester(settings, backend.clone());
    let email = Email::new(
        "Receipt",
        "orders@example-exchange.io",
        "Tue, 16 Jan 2024 08:00:00 +0000",
        "Hi Jane Doe, you bought 0.5 ETH for 1,200.00 EUR.\nQuestions? Write to jane.doe@example.com",
    );

    harvester.process(&email).await;

    let prompts = backend.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(!prompts[0].contains("jane.doe@example.com"));
    assert!(!prompts[0].contains("Jane Doe"));
    assert!(prompts[0].contains("[EMAIL]"));
    assert!(prompts[0].contains("ETH"));
}

#[tokio::test]
async fn processed_emails_are_remembered_across_runs() {
    let dir = TempDir::new().unwrap();
    let settings = Settings {
        dedup_history_file: Some(dir.path().join("history.json")),
        ..common::test_settings()
    };

    let first = Arc::new(Harvester::from_settings(settings.clone(), false).unwrap());
    let summary = first.process_batch(vec![common::coinbase_email()], None).await;
    assert_eq!(summary.purchases.len(), 1);

    let second = Arc::new(Harvester::from_settings(settings.clone(), false).unwrap());
    let summary = second.process_batch(vec![common::coinbase_email()], None).await;
    assert_eq!(summary.emails_skipped_duplicate, 1);
    assert_eq!(summary.emails_processed, 0);

    // a dry run sees the history but never adds to it
    let dry = Arc::new(Harvester::from_settings(settings, true).unwrap());
    dry.dedup().reset();
    let summary = dry.process_batch(vec![common::coinbase_email()], None).await;
    assert_eq!(summary.purchases.len(), 1);
    assert_eq!(dry.dedup().len(), 0);
}

#[tokio::test]
async fn emails_whose_model_call_failed_are_retried_on_the_next_run() {
    let dir = TempDir::new().unwrap();
    let history = dir.path().join("history.json");
    let email = common::unknown_exchange_email("Order complete");
    let run = |backend: Arc<MockBackend>| {
        Arc::new(Harvester::new(
            common::test_settings(),
            common::gateway_over(backend, 3),
            Arc::new(DedupIndex::open(&history, false)),
        ))
    };

    let down = Arc::new(
        MockBackend::new("down").with_router(|_: &str| -> Result<String, ProviderError> { Err(ProviderError::Timeout(30)) }),
    );
    let summary = run(down.clone()).process_batch(vec![email.clone()], None).await;
    assert_eq!(summary.emails_processed, 1);
    assert!(summary.purchases.is_empty());
    assert!(summary.notes.iter().any(|n| n.starts_with("LLM classification failed")));
    assert_eq!(down.call_count(), 3);

    let extraction = json!({"transactions": [{
        "amount": "0.5",
        "item_name": "ETH",
        "total_spent": "1200.00",
        "currency": "EUR",
        "vendor": "Example Exchange",
        "transaction_id": "EX-9921"
    }]});
    let healthy = common::scripted_backend(positive(), extraction.clone());
    let summary = run(healthy.clone()).process_batch(vec![email.clone()], None).await;
    assert_eq!(summary.emails_skipped_duplicate, 0);
    assert_eq!(summary.emails_processed, 1);
    assert_eq!(summary.purchases.len(), 1);
    assert_eq!(healthy.call_count(), 2);

    // handled once, so the third run skips it without asking the model
    let idle = common::scripted_backend(positive(), extraction);
    let summary = run(idle.clone()).process_batch(vec![email], None).await;
    assert_eq!(summary.emails_skipped_duplicate, 1);
    assert_eq!(summary.emails_processed, 0);
    assert_eq!(idle.call_count(), 0);
}

#[tokio::test]
async fn missing_prompt_templates_are_reported_without_calling_the_model() {
    let backend = common::scripted_backend(positive(), json!({"transactions": []}));
    let harvester = Harvester::with_parts(
        common::test_settings(),
        common::gateway_over(backend.clone(), 3),
        Arc::new(DedupIndex::in_memory()),
        ExtractorRegistry::with_default_extractors(),
        PromptLibrary::new(),
    );

    let outcome = harvester.process(&common::unknown_exchange_email("Receipt")).await;

    assert!(!outcome.has_purchase);
    let expected = format!("No prompt template named '{}'", prompts::CLASSIFICATION);
    assert!(
        outcome.processing_notes.iter().any(|n| n.contains(&expected)),
        "{:?}",
        outcome.processing_notes
    );
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn an_overflowing_vendor_total_does_not_stop_the_batch() {
    let settings = Settings {
        enable_preprocessing: false,
        ..common::test_settings()
    };
    let backend = common::scripted_backend(negative(), json!({"transactions": []}));
    let harvester = common::harvester(settings, backend.clone());
    let huge = Email::new(
        "Exchange Trade Execution",
        "support@bitfinex.com",
        "Mon, 15 Jan 2024 10:30:00 +0000",
        "BUY 50000000000000000000000000000 BTC @ 2 USD",
    );

    let summary = harvester.process_batch(vec![huge, common::coinbase_email()], None).await;

    assert_eq!(summary.emails_processed, 2);
    assert_eq!(summary.purchases.len(), 1);
    assert_eq!(summary.purchases[0].vendor, "Coinbase");
    // the failed extractor is skipped and the model gets the email instead
    assert_eq!(backend.call_count(), 1);
}
