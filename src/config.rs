//! Configuration types for blocklog
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros (every setting can
//!   also come from the environment)
//! - Validated runtime configuration shared by all components
//! - Partition list parsing

use crate::error::ConfigError;
use clap::{Parser, Subcommand};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Batch size limits
const MIN_BATCH_SIZE: usize = 1;
const MAX_BATCH_SIZE: usize = 100_000;

/// Page size limits for the query shell
const MIN_PAGE_SIZE: usize = 1;
const MAX_PAGE_SIZE: usize = 1_000;

/// Partition names become table identifiers
static PARTITION_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid partition regex"));

/// Block log ingestion and query tool
#[derive(Parser, Debug, Clone)]
#[command(
    name = "blocklog",
    version,
    about = "Ingest block logs into SQLite and search them by position and time",
    long_about = "Extracts archived block logs, parses every event line into a per-partition\n\
                  SQLite table (duplicates are ignored, progress is resumable), and serves an\n\
                  interactive shell for proximity and time-window queries.",
    after_help = "EXAMPLES:\n    \
        blocklog --db logs.db --tables '[\"overworld\",\"nether\"]' ingest \\\n        \
            --zip-dir ./archives --extract-dir ./extracted --progress-log progress.json\n    \
        blocklog --db logs.db --tables overworld,nether query\n    \
        blocklog --db logs.db --tables overworld ledger --progress-log progress.json"
)]
pub struct CliArgs {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,

    /// SQLite database file
    #[arg(long = "db", env = "SQLITE3_DB_FILE", value_name = "FILE", global = true)]
    pub db: Option<PathBuf>,

    /// Partition tables, as a JSON array or comma-separated list
    #[arg(long, env = "SQLITE3_DB_TABLES", value_name = "LIST", global = true)]
    pub tables: Option<String>,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Extract archives and ingest every log file not yet in the ledger
    Ingest {
        /// Directory of log archives to extract
        #[arg(long, env = "PATH_TO_ZIP_DIR", value_name = "DIR")]
        zip_dir: Option<PathBuf>,

        /// Directory holding one sub-directory of log files per partition
        #[arg(long, env = "DIRECTORY_TO_EXTRACT_TO", value_name = "DIR")]
        extract_dir: PathBuf,

        /// Progress ledger file
        #[arg(long, env = "PROGRESS_LOG", value_name = "FILE")]
        progress_log: PathBuf,

        /// Records per insert transaction
        #[arg(short = 'b', long, env = "BATCH_SIZE", default_value = "1000", value_name = "NUM")]
        batch_size: usize,

        /// Do not extract archives; ingest what is already extracted
        #[arg(long)]
        skip_extract: bool,
    },

    /// Start the interactive query shell
    Query {
        /// Rows per result page
        #[arg(long, default_value = "10", value_name = "NUM")]
        page_size: usize,
    },

    /// Print the files recorded in the progress ledger
    Ledger {
        /// Progress ledger file
        #[arg(long, env = "PROGRESS_LOG", value_name = "FILE")]
        progress_log: PathBuf,
    },
}

/// Store settings shared by ingestion and queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// SQLite database path
    pub db_path: PathBuf,

    /// Partition names in configured order
    pub partitions: Vec<String>,

    /// Show progress bars and banners
    pub show_progress: bool,
}

impl Settings {
    /// Build and validate store settings from CLI arguments
    pub fn from_args(args: &CliArgs) -> Result<Self, ConfigError> {
        let db_path = args.db.clone().ok_or_else(|| ConfigError::InvalidFilePath {
            setting: "database",
            path: PathBuf::new(),
            reason: "--db or SQLITE3_DB_FILE is required".to_string(),
        })?;
        check_parent_exists("database", &db_path)?;

        let raw = args.tables.as_deref().ok_or(ConfigError::NoPartitions)?;
        let partitions = parse_partitions(raw)?;

        Ok(Self {
            db_path,
            partitions,
            show_progress: !args.quiet,
        })
    }
}

/// Validated ingestion configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub settings: Settings,

    /// Archive directory (extraction skipped when absent)
    pub archive_dir: Option<PathBuf>,

    /// Directory with one sub-directory per partition
    pub extract_dir: PathBuf,

    /// Progress ledger path
    pub ledger_path: PathBuf,

    /// Records per insert transaction
    pub batch_size: usize,
}

impl IngestConfig {
    /// Create and validate ingestion configuration
    pub fn new(
        settings: Settings,
        archive_dir: Option<PathBuf>,
        extract_dir: PathBuf,
        ledger_path: PathBuf,
        batch_size: usize,
    ) -> Result<Self, ConfigError> {
        if !(MIN_BATCH_SIZE..=MAX_BATCH_SIZE).contains(&batch_size) {
            return Err(ConfigError::InvalidBatchSize {
                size: batch_size,
                min: MIN_BATCH_SIZE,
                max: MAX_BATCH_SIZE,
            });
        }

        if let Some(ref dir) = archive_dir {
            check_directory("PATH_TO_ZIP_DIR", dir)?;
        }
        check_directory("DIRECTORY_TO_EXTRACT_TO", &extract_dir)?;
        check_parent_exists("progress log", &ledger_path)?;

        Ok(Self {
            settings,
            archive_dir,
            extract_dir,
            ledger_path,
            batch_size,
        })
    }

    /// Directory holding the log files of one partition
    pub fn partition_dir(&self, partition: &str) -> PathBuf {
        self.extract_dir.join(partition)
    }
}

/// Validate the query shell's page size
pub fn validate_page_size(size: usize) -> Result<usize, ConfigError> {
    if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&size) {
        return Err(ConfigError::InvalidPageSize {
            size,
            min: MIN_PAGE_SIZE,
            max: MAX_PAGE_SIZE,
        });
    }
    Ok(size)
}

/// Parse a partition list given as a JSON array or a comma-separated list
pub fn parse_partitions(raw: &str) -> Result<Vec<String>, ConfigError> {
    let trimmed = raw.trim();

    let names: Vec<String> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(|e| ConfigError::InvalidPartitionList {
            value: raw.to_string(),
            reason: e.to_string(),
        })?
    } else {
        trimmed
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    };

    if names.is_empty() {
        return Err(ConfigError::NoPartitions);
    }

    let mut partitions: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !PARTITION_NAME_REGEX.is_match(&name) {
            return Err(ConfigError::InvalidPartitionName { name });
        }
        if partitions.contains(&name) {
            return Err(ConfigError::DuplicatePartition { name });
        }
        partitions.push(name);
    }

    Ok(partitions)
}

fn check_directory(setting: &'static str, path: &Path) -> Result<(), ConfigError> {
    if !path.is_dir() {
        return Err(ConfigError::InvalidDirectory {
            setting,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn check_parent_exists(setting: &'static str, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(ConfigError::InvalidFilePath {
                setting,
                path: path.to_path_buf(),
                reason: format!("Parent directory '{}' does not exist", parent.display()),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn settings() -> Settings {
        Settings {
            db_path: PathBuf::from("logs.db"),
            partitions: vec!["overworld".into()],
            show_progress: false,
        }
    }

    #[test]
    fn test_parse_partitions_json() {
        let parts = parse_partitions(r#"["overworld", "the_nether", "the_end"]"#).unwrap();
        assert_eq!(parts, vec!["overworld", "the_nether", "the_end"]);
    }

    #[test]
    fn test_parse_partitions_csv() {
        let parts = parse_partitions(" overworld, nether ,").unwrap();
        assert_eq!(parts, vec!["overworld", "nether"]);
    }

    #[test]
    fn test_parse_partitions_invalid() {
        assert!(matches!(parse_partitions(""), Err(ConfigError::NoPartitions)));
        assert!(matches!(parse_partitions("[]"), Err(ConfigError::NoPartitions)));
        assert!(matches!(
            parse_partitions("[\"over"),
            Err(ConfigError::InvalidPartitionList { .. })
        ));
        assert!(matches!(
            parse_partitions("overworld,drop table"),
            Err(ConfigError::InvalidPartitionName { .. })
        ));
        assert!(matches!(
            parse_partitions("a,b,a"),
            Err(ConfigError::DuplicatePartition { .. })
        ));
    }

    #[test]
    fn test_settings_from_args() {
        let args = CliArgs::parse_from([
            "blocklog",
            "--db",
            "logs.db",
            "--tables",
            "overworld,nether",
            "-q",
            "query",
        ]);
        let s = Settings::from_args(&args).unwrap();
        assert_eq!(s.partitions, vec!["overworld", "nether"]);
        assert!(!s.show_progress);
    }

    #[test]
    fn test_ingest_config_validation() {
        let dir = tempdir().unwrap();
        let extract = dir.path().to_path_buf();
        let ledger = dir.path().join("progress.json");

        assert!(IngestConfig::new(settings(), None, extract.clone(), ledger.clone(), 500).is_ok());

        assert!(matches!(
            IngestConfig::new(settings(), None, extract.clone(), ledger.clone(), 0),
            Err(ConfigError::InvalidBatchSize { .. })
        ));
        assert!(matches!(
            IngestConfig::new(settings(), None, dir.path().join("missing"), ledger.clone(), 10),
            Err(ConfigError::InvalidDirectory { .. })
        ));
        assert!(matches!(
            IngestConfig::new(settings(), None, extract, dir.path().join("no/such/progress.json"), 10),
            Err(ConfigError::InvalidFilePath { .. })
        ));
    }

    #[test]
    fn test_page_size() {
        assert_eq!(validate_page_size(10).unwrap(), 10);
        assert!(validate_page_size(0).is_err());
        assert!(validate_page_size(5000).is_err());
    }
}
