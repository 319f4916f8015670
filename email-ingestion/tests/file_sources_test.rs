use anyhow::Result;
use email_ingestion::{parse_message, read_mbox, FileMailSource, IngestionError, MailboxKind};
use interfaces::defs::EmailSource;
use std::fs;
use tempfile::TempDir;

const COINBASE_MESSAGE: &str = "From: Coinbase <no-reply@coinbase.com>\r\n\
To: user@example.com\r\n\
Subject: You bought Bitcoin\r\n\
Date: Mon, 15 Jan 2024 10:30:00 +0000\r\n\
Message-ID: <cb-1@coinbase.com>\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
You successfully purchased 0.001 BTC for $100.00 USD.\r\n";

const KRAKEN_MESSAGE: &str = "From: support@kraken.com\r\n\
Subject: Trade confirmation\r\n\
Date: Tue, 16 Jan 2024 08:00:00 +0000\r\n\
Content-Type: text/plain\r\n\
\r\n\
You bought 0.75 XBT (BTC) for $35,000.00 USD.\r\n";

#[test]
fn parses_headers_and_plain_body() {
    let email = parse_message(COINBASE_MESSAGE.as_bytes()).expect("message should parse");

    assert_eq!(email.subject, "You bought Bitcoin");
    assert_eq!(email.sender, "Coinbase <no-reply@coinbase.com>");
    assert!(email.body.contains("purchased 0.001 BTC"));
    assert_eq!(email.message_id.as_deref(), Some("cb-1@coinbase.com"));
    assert!(email.date.contains("2024"));
}

#[test]
fn reads_every_message_in_an_mbox() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("inbox.mbox");
    let mbox = format!(
        "From MAILER-DAEMON Mon Jan 15 10:30:00 2024\n{}\nFrom MAILER-DAEMON Tue Jan 16 08:00:00 2024\n{}\n",
        COINBASE_MESSAGE.replace("\r\n", "\n"),
        KRAKEN_MESSAGE.replace("\r\n", "\n"),
    );
    fs::write(&path, mbox)?;

    let emails = read_mbox(&path)?;
    assert_eq!(emails.len(), 2);
    assert_eq!(emails[1].sender, "support@kraken.com");
    Ok(())
}

#[test]
fn missing_mbox_is_source_not_found() {
    let err = read_mbox(std::path::Path::new("/definitely/not/here.mbox")).unwrap_err();
    assert!(matches!(err, IngestionError::SourceNotFound(_)));
}

#[tokio::test]
async fn missing_source_yields_empty_sequence() -> Result<()> {
    let source = FileMailSource::mbox("/definitely/not/here.mbox");
    assert!(source.fetch_emails().await?.is_empty());

    let source = FileMailSource::eml_dir("/definitely/not/a/dir");
    assert!(source.fetch_emails().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn eml_directory_is_walked_recursively() -> Result<()> {
    let dir = TempDir::new()?;
    let nested = dir.path().join("2024");
    fs::create_dir_all(&nested)?;
    fs::write(dir.path().join("a.eml"), COINBASE_MESSAGE)?;
    fs::write(nested.join("b.EML"), KRAKEN_MESSAGE)?;
    fs::write(dir.path().join("notes.txt"), "not an email")?;

    let source = FileMailSource::detect(dir.path());
    assert_eq!(source.kind(), MailboxKind::EmlDirectory);

    let emails = source.fetch_emails().await?;
    assert_eq!(emails.len(), 2);
    assert!(emails.iter().any(|e| e.subject == "Trade confirmation"));
    Ok(())
}
