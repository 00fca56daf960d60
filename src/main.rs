//! ReelScout - short-video discovery and transcript enrichment
//!
//! Scrapes competitor accounts and hashtags for short videos, stores the
//! qualifying ones, and enriches them with speech-to-text transcripts.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reelscout::cli::{Args, Commands};
use reelscout::config::Config;
use reelscout::enhance::OpenAiCompletionClient;
use reelscout::error::ReelError;
use reelscout::ingest::IngestionOrchestrator;
use reelscout::media::MediaAcquirer;
use reelscout::scrape::apify::ApifyScraper;
use reelscout::store::postgres::PostgresStore;
use reelscout::transcribe::WhisperApiClient;
use reelscout::workflow::TranscriptionOrchestrator;

/// Scratch files older than this are leftovers from crashed runs.
const STALE_SCRATCH_AGE: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::InitConfig { output } => {
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
        Commands::Ingest { source } => {
            let store = connect_store(&args.database_url).await?;
            let scraper = build_scraper(&config)?;
            let batch = source.to_batch(config.scrape.default_limit);

            let orchestrator = IngestionOrchestrator::new(&scraper, &store);
            let spinner = batch_spinner("Scraping and storing records...");
            let report = orchestrator.run(&batch).await?;
            spinner.finish_and_clear();
            println!(
                "Ingested {} new records ({} duplicates, {} rejected, {} errors)",
                report.inserted, report.duplicates, report.rejected, report.errors
            );
        }
        Commands::Transcribe { selection } => {
            let store = connect_store(&args.database_url).await?;
            let (acquirer, engine, completions) = build_transcription_stack(&config).await?;

            let orchestrator = TranscriptionOrchestrator::new(
                &store,
                &acquirer,
                &engine,
                &completions,
                &config,
            );
            let spinner = batch_spinner("Transcribing records...");
            let report = orchestrator
                .run_batch(&selection.to_selection(), selection.limit)
                .await?;
            spinner.finish_and_clear();
            println!(
                "Transcribed {} records ({} completed, {} rejected, {} skipped, {} errors)",
                report.processed, report.completed, report.rejected, report.skipped, report.errors
            );
        }
        Commands::Cycle { source } => {
            let store = connect_store(&args.database_url).await?;
            let scraper = build_scraper(&config)?;
            let (acquirer, engine, completions) = build_transcription_stack(&config).await?;

            let batch = source.to_batch(config.scrape.default_limit);
            let ingestion = IngestionOrchestrator::new(&scraper, &store);
            let spinner = batch_spinner("Scraping and storing records...");
            let ingest_report = ingestion.run(&batch).await?;
            spinner.finish_and_clear();
            println!(
                "Ingested {} new records ({} duplicates, {} rejected, {} errors)",
                ingest_report.inserted,
                ingest_report.duplicates,
                ingest_report.rejected,
                ingest_report.errors
            );

            let orchestrator = TranscriptionOrchestrator::new(
                &store,
                &acquirer,
                &engine,
                &completions,
                &config,
            );
            let spinner = batch_spinner("Transcribing records...");
            let report = orchestrator
                .run_batch(&source.to_selection(), config.scrape.default_limit)
                .await?;
            spinner.finish_and_clear();
            println!(
                "Transcribed {} records ({} completed, {} rejected, {} skipped, {} errors)",
                report.processed, report.completed, report.rejected, report.skipped, report.errors
            );
        }
    }

    Ok(())
}

fn batch_spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or(ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

async fn connect_store(database_url: &Option<String>) -> Result<PostgresStore> {
    let url = database_url
        .clone()
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .ok_or_else(|| {
            ReelError::Config("DATABASE_URL is not set in arguments or environment".to_string())
        })?;

    let store = PostgresStore::connect(&url).await?;
    store.ensure_schema().await?;
    Ok(store)
}

fn build_scraper(config: &Config) -> Result<ApifyScraper> {
    let token = config.apify_token()?;
    Ok(ApifyScraper::new(token, config.scrape.actor.clone()))
}

async fn build_transcription_stack(
    config: &Config,
) -> Result<(MediaAcquirer, WhisperApiClient, OpenAiCompletionClient)> {
    // Credentials are resolved before any record is touched so a bad key
    // fails the whole command, not the middle of a batch.
    let api_key = config.openai_api_key()?;

    let acquirer = MediaAcquirer::new(config.media.clone())?;
    acquirer.check_tools().await?;
    let swept = acquirer.workspace().sweep_stale(STALE_SCRATCH_AGE)?;
    if swept > 0 {
        info!(count = swept, "Swept stale scratch files from previous runs");
    }

    let engine = WhisperApiClient::new(api_key.clone(), config.transcribe.model.clone());
    let completions = OpenAiCompletionClient::new(api_key, &config.enhance);
    Ok((acquirer, engine, completions))
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".reelscout").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "reelscout.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
