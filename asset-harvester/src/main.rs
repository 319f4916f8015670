use anyhow::{Context, Result};
use asset_harvester::telemetry::init_tracing;
use asset_harvester::{export_fields, Harvester, JsonFileSink, ProgressCallback, Settings};
use clap::Parser;
use email_ingestion::FileMailSource;
use interfaces::{EmailSource, RecordSink};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "asset-harvester", version, about = "Extract digital-asset transactions from email")]
struct Cli {
    /// An .mbox file or a directory of .eml files
    #[arg(value_name = "MAILBOX")]
    input: PathBuf,

    /// TOML settings file (defaults to $HARVESTER_CONFIG_FILE, then config/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Where accepted records are written as JSON
    #[arg(long, short, value_name = "FILE", default_value = "purchases.json")]
    output: PathBuf,

    /// Override the configured LLM provider
    #[arg(long)]
    provider: Option<String>,

    /// Process emails concurrently
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Worker count for --parallel
    #[arg(long)]
    workers: Option<usize>,

    /// Do not record anything in the dedup history and do not write output
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Forget the dedup history before processing
    #[arg(long, default_value_t = false)]
    reset_dedup: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let workers = cli.workers.map(|w| w.to_string());
    let mut overrides: Vec<(&str, &str)> = Vec::new();
    if let Some(provider) = &cli.provider {
        overrides.push(("llm_provider", provider.as_str()));
    }
    if cli.parallel {
        overrides.push(("enable_parallel_processing", "true"));
    }
    if let Some(workers) = &workers {
        overrides.push(("max_workers", workers.as_str()));
    }
    let settings = Settings::load(cli.config.as_deref(), &overrides).context("loading settings")?;
    init_tracing(&settings);

    let harvester = Arc::new(Harvester::from_settings(settings, cli.dry_run).context("building pipeline")?);
    if cli.reset_dedup {
        info!("Resetting dedup history");
        harvester.dedup().reset();
    }

    let source = FileMailSource::detect(&cli.input);
    let emails = source.fetch_emails().await?;
    info!("Processing {} emails from {}", emails.len(), source.source_name());

    let progress: ProgressCallback = Arc::new(|done, total| {
        info!("Processed {}/{} emails", done, total);
    });
    let summary = harvester.process_batch(emails, Some(progress)).await;

    for note in &summary.notes {
        info!("{}", note);
    }
    for (name, value) in &summary.metrics {
        info!("  {}: {}", name, value);
    }

    if cli.dry_run {
        warn!("Dry run: {} purchase(s) found, nothing written", summary.purchases.len());
        return Ok(());
    }

    let records = export_fields(&summary.purchases);
    let written = JsonFileSink.write_records(&records, &cli.output)?;
    info!(
        "Harvest complete: {} emails, {} skipped as duplicates, {} records written to {}",
        summary.emails_processed,
        summary.emails_skipped_duplicate,
        written,
        cli.output.display()
    );
    Ok(())
}
