//! blocklog - Block Log Ingestion and Query Tool
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use blocklog::archive::TarExtractor;
use blocklog::config::{validate_page_size, CliArgs, Command, IngestConfig, Settings};
use blocklog::db::{create_partition_tables, open_store};
use blocklog::ingest::Ingestor;
use blocklog::ledger::ProgressLedger;
use blocklog::progress::{format_number, print_header, print_summary};
use blocklog::shell::Shell;
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    setup_logging(args.verbose)?;

    match args.command.clone() {
        Command::Ingest {
            zip_dir,
            extract_dir,
            progress_log,
            batch_size,
            skip_extract,
        } => {
            let settings = Settings::from_args(&args).context("Invalid configuration")?;
            let archive_dir = if skip_extract { None } else { zip_dir };
            let config = IngestConfig::new(settings, archive_dir, extract_dir, progress_log, batch_size)
                .context("Invalid configuration")?;
            run_ingest(config)
        }
        Command::Query { page_size } => {
            let settings = Settings::from_args(&args).context("Invalid configuration")?;
            let page_size = validate_page_size(page_size).context("Invalid configuration")?;
            run_query(settings, page_size)
        }
        Command::Ledger { progress_log } => run_ledger(progress_log),
    }
}

/// Extract archives, then ingest every partition
fn run_ingest(config: IngestConfig) -> Result<()> {
    let db_path = config.settings.db_path.clone();

    if config.settings.show_progress {
        let source = config.archive_dir.as_ref().unwrap_or(&config.extract_dir);
        print_header(source, &config.settings.partitions, &db_path);
    }

    let conn = open_store(&db_path).context("Failed to open database")?;
    let ingestor = Ingestor::new(&config, &conn);

    let extracted = ingestor
        .extract(&TarExtractor)
        .context("Archive extraction failed")?;
    if extracted > 0 {
        info!(archives = extracted, "Extracted archives");
    }

    let summary = ingestor.run().context("Ingestion failed")?;

    if config.settings.show_progress {
        print_summary(&summary, &db_path);
    } else {
        info!(
            added = summary.writes.rows_added,
            duplicates = summary.writes.duplicates(),
            files = summary.files_parsed,
            "Ingestion complete"
        );
    }

    Ok(())
}

/// Serve the interactive shell on stdin/stdout
fn run_query(settings: Settings, page_size: usize) -> Result<()> {
    let conn = open_store(&settings.db_path).context("Failed to open database")?;
    create_partition_tables(&conn, &settings.partitions).context("Failed to prepare tables")?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    Shell::new(&conn, &settings, page_size, stdin.lock(), stdout.lock())
        .run()
        .context("Query shell failed")?;

    Ok(())
}

/// Print every file recorded in the progress ledger
fn run_ledger(path: PathBuf) -> Result<()> {
    let ledger = ProgressLedger::new(path);
    let document = ledger
        .load()
        .with_context(|| format!("Failed to read ledger {}", ledger.path().display()))?;

    for file in &document.files {
        println!("{}", file);
    }
    println!("{} files ingested", format_number(document.files.len() as u64));

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("blocklog=debug,warn")
    } else {
        EnvFilter::new("blocklog=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(io::stderr)
        .init();

    Ok(())
}
