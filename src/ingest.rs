//! Incremental ingestion pipeline
//!
//! For each configured partition, in order:
//!
//! ```text
//! <extract_dir>/<partition>/*  ──▶  minus ledger snapshot
//!        │
//!        ▼  (per file, directory order)
//!   ledger re-check ──▶ parse ──▶ BatchWriter ──▶ flush ──▶ ledger.mark_done
//! ```
//!
//! A parse error aborts the whole run. Batches flushed before the error
//! stay committed; the file is not marked done, so the next run parses it
//! again and the uniqueness constraint absorbs the repeated rows.

use crate::archive::{list_files, ArchiveExtractor};
use crate::config::IngestConfig;
use crate::db::{create_partition_table, BatchWriter, WriterStats};
use crate::error::{AppError, Result};
use crate::ledger::ProgressLedger;
use crate::parser::parse_records;
use crate::progress::ProgressReporter;
use rusqlite::Connection;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Totals for one ingestion run
#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    /// Partitions visited
    pub partitions: usize,

    /// Files parsed and marked done
    pub files_parsed: u64,

    /// Files skipped because the ledger already lists them
    pub files_skipped: u64,

    /// Store counters summed over all files
    pub writes: WriterStats,

    pub duration: Duration,
}

/// Files of one partition, split by a ledger snapshot
#[derive(Debug, Clone)]
struct PartitionPlan {
    partition: String,
    pending: Vec<String>,
    skipped: Vec<String>,
}

/// Drives one ingestion run
pub struct Ingestor<'a> {
    config: &'a IngestConfig,
    conn: &'a Connection,
    ledger: ProgressLedger,
}

impl<'a> Ingestor<'a> {
    pub fn new(config: &'a IngestConfig, conn: &'a Connection) -> Self {
        Self {
            config,
            conn,
            ledger: ProgressLedger::new(&config.ledger_path),
        }
    }

    /// Run the configured extractor over the archive directory
    pub fn extract(&self, extractor: &dyn ArchiveExtractor) -> Result<usize> {
        match self.config.archive_dir {
            Some(ref dir) => Ok(extractor.extract_all(dir, &self.config.extract_dir)?),
            None => Ok(0),
        }
    }

    /// Ingest every partition
    pub fn run(&self) -> Result<IngestSummary> {
        let start = Instant::now();
        let mut summary = IngestSummary::default();

        for partition in &self.config.settings.partitions {
            create_partition_table(self.conn, partition)?;
            self.ingest_partition(partition, &mut summary)?;
            summary.partitions += 1;
        }

        summary.duration = start.elapsed();
        info!(
            added = summary.writes.rows_added,
            attempted = summary.writes.rows_attempted,
            files = summary.files_parsed,
            skipped = summary.files_skipped,
            "Ingestion finished"
        );
        Ok(summary)
    }

    fn ingest_partition(&self, partition: &str, summary: &mut IngestSummary) -> Result<()> {
        match self.plan_partition(partition)? {
            Some(plan) => self.process_plan(&plan, summary),
            None => {
                warn!(partition, "Partition directory missing, nothing to ingest");
                Ok(())
            }
        }
    }

    /// Split a partition's files using one ledger snapshot
    fn plan_partition(&self, partition: &str) -> Result<Option<PartitionPlan>> {
        let Some(files) = self.partition_files(partition)? else {
            return Ok(None);
        };

        let done = self.ledger.snapshot()?;
        let (skipped, pending): (Vec<_>, Vec<_>) =
            files.into_iter().partition(|f| done.contains(f.as_str()));

        Ok(Some(PartitionPlan {
            partition: partition.to_string(),
            pending,
            skipped,
        }))
    }

    /// Ingest the pending files of a plan, re-checking the ledger per file
    fn process_plan(&self, plan: &PartitionPlan, summary: &mut IngestSummary) -> Result<()> {
        let partition = plan.partition.as_str();

        for path in &plan.skipped {
            warn!(path = %path, "Skipped, already parsed");
        }
        summary.files_skipped += plan.skipped.len() as u64;

        info!(
            partition,
            pending = plan.pending.len(),
            skipped = plan.skipped.len(),
            "Ingesting partition"
        );

        let reporter = ProgressReporter::new(
            partition,
            plan.pending.len() as u64,
            self.config.settings.show_progress,
        );

        for path in &plan.pending {
            // The snapshot may be stale if another run finished this file
            if self.ledger.is_done(path)? {
                warn!(path = %path, "Skipped, already parsed");
                summary.files_skipped += 1;
                reporter.inc();
                continue;
            }

            reporter.set_status(path);
            let stats = self.ingest_file(partition, Path::new(path))?;
            self.ledger.mark_done(path)?;

            summary.files_parsed += 1;
            summary.writes.merge(&stats);
            reporter.inc();
        }

        reporter.finish_and_clear();
        Ok(())
    }

    /// Parse one file into `partition`'s table; does not touch the ledger
    pub fn ingest_file(&self, partition: &str, path: &Path) -> Result<WriterStats> {
        info!(path = %path.display(), partition, "Parsing");

        let bytes = fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);

        let mut writer = BatchWriter::new(self.conn, partition, self.config.batch_size);
        for record in parse_records(&text) {
            let record = record.map_err(|e| AppError::Parse(e.in_file(path)))?;
            writer.stage(record)?;
        }
        let stats = writer.finish()?;

        info!(
            path = %path.display(),
            added = stats.rows_added,
            duplicates = stats.duplicates(),
            "Parsed"
        );
        Ok(stats)
    }

    /// Absolute paths of candidate files, or None if the directory is absent
    fn partition_files(&self, partition: &str) -> Result<Option<Vec<String>>> {
        let dir = self.config.partition_dir(partition);
        let dir: PathBuf = match fs::canonicalize(&dir) {
            Ok(d) => d,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let files = list_files(&dir)?
            .into_iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        Ok(Some(files))
    }
}
