//! hashward: hash-based malware scanner with quarantine.
//!
//! This is the main entry point for the CLI application.

use hashward::core::config::Config;
use hashward::core::error::{Error, Result};
use hashward::core::types::ScanSummary;
use hashward::detection::{client_from_config, Classifier, HeuristicEvaluator, SignatureStore};
use hashward::quarantine::QuarantineVault;
use hashward::scanner::{spawn_watcher, EngineOptions, ScanEngine};
use hashward::ui::cli::{Cli, Commands, OutputFormat, QuarantineAction};
use hashward::utils::logging::{init_logging, LogConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(hint) = e.suggestion() {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    // The log sink comes from the config, so a load failure is reported once
    // logging is up.
    let (config, load_error) = Config::load_with_fallback(cli.config.as_deref());

    let mut log_config = LogConfig::from_config(&config);
    if cli.verbose {
        log_config = log_config.verbose();
    }
    init_logging(log_config)?;

    log::info!("hashward v{}", env!("CARGO_PKG_VERSION"));
    if let Some(e) = load_error {
        log::warn!("Failed to load config, using defaults: {}", e);
    }
    config.validate()?;

    match cli.command {
        Commands::Scan {
            directory,
            realtime,
        } => run_scan(&config, directory, realtime, cli.format).await,
        Commands::Quarantine { action } => run_quarantine(&config, action, cli.format),
        Commands::Signatures => run_signatures(&config, cli.format),
    }
}

/// Build the engine from configuration.
fn build_engine(config: &Config) -> Result<ScanEngine> {
    let signatures = Arc::new(SignatureStore::from_config(&config.detection)?);
    log::debug!("{} signature(s) loaded", signatures.len());

    let reputation = client_from_config(&config.reputation);
    log::debug!("Reputation service: {}", reputation.name());

    let classifier = Classifier::new(signatures, HeuristicEvaluator::from_config(&config.detection))
        .with_reputation(reputation)
        .with_lookup_timeout(config.reputation.timeout());

    let vault = QuarantineVault::open(&config.quarantine.dir)?;
    log::debug!("Quarantine root: {:?}", vault.base_path());

    Ok(ScanEngine::new(
        classifier,
        vault,
        EngineOptions::from_config(&config.scan),
    ))
}

/// Run a batch or realtime scan.
async fn run_scan(
    config: &Config,
    directory: Option<PathBuf>,
    realtime: bool,
    format: OutputFormat,
) -> Result<()> {
    let directory = directory
        .ok_or_else(|| Error::config_invalid("directory", "no directory given to scan"))?;
    if !directory.is_dir() {
        return Err(Error::InvalidTarget(directory));
    }

    let engine = Arc::new(build_engine(config)?);

    let summary = if realtime {
        run_monitor(config, &engine, &directory).await?
    } else {
        let interrupt = Arc::clone(&engine);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupt received, stopping after the current file");
                interrupt.cancel();
            }
        });
        engine.scan_directory(&directory).await?
    };

    print_summary(&summary, format)
}

async fn run_monitor(config: &Config, engine: &ScanEngine, directory: &Path) -> Result<ScanSummary> {
    // Started before the baseline so changes made during it are queued.
    let (_guard, events) = spawn_watcher(directory, config.monitor.queue_capacity)?;

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::warn!("Interrupt received, stopping monitor"),
            Err(e) => {
                log::error!("Cannot listen for interrupts: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    engine.monitor(directory, events, shutdown).await
}

fn print_summary(summary: &ScanSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
        OutputFormat::Text => {
            println!();
            println!("=== Scan Summary ===");
            println!("Target:            {}", summary.target.display());
            println!("Status:            {}", summary.status);
            println!("Files Scanned:     {}", summary.files_scanned);
            println!("Malware Found:     {}", summary.malware_found);
            println!("Files Quarantined: {}", summary.files_quarantined);
            println!("Errors:            {}", summary.errors);
            if let Some(duration) = summary.duration_secs() {
                println!("Duration:          {} seconds", duration);
            }
        }
    }
    Ok(())
}

/// Manage quarantine.
fn run_quarantine(config: &Config, action: QuarantineAction, format: OutputFormat) -> Result<()> {
    match action {
        QuarantineAction::List { dir } => {
            let dir = dir.unwrap_or_else(|| config.quarantine.dir.clone());
            let vault = QuarantineVault::open(&dir)?;
            let records = vault.list()?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&records)?);
                }
                OutputFormat::Text => {
                    if records.is_empty() {
                        println!("Quarantine is empty.");
                        return Ok(());
                    }

                    println!("{:<20} {:<30} STORED AS", "QUARANTINED", "ORIGINAL NAME");
                    for record in &records {
                        println!(
                            "{:<20} {:<30} {}",
                            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                            record.original_name,
                            record.stored_path.display()
                        );
                    }
                    println!();
                    println!("{} item(s) in {}", records.len(), vault.base_path().display());
                }
            }
        }
    }
    Ok(())
}

/// Show loaded signatures.
fn run_signatures(config: &Config, format: OutputFormat) -> Result<()> {
    let store = SignatureStore::from_config(&config.detection)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(store.entries())?);
        }
        OutputFormat::Text => {
            println!("{} signature(s) loaded", store.len());
            for entry in store.entries() {
                println!(
                    "  {:<16} {:<32} {}",
                    entry.id,
                    entry.name,
                    entry.sha256.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}
