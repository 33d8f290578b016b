//! Error types for blocklog
//!
//! This module defines the error hierarchy that covers:
//! - Configuration errors (fatal at startup)
//! - Line parse errors (fatal for the ingestion run)
//! - SQLite store and progress ledger errors
//! - Query parameter compile errors (reported, never fatal)
//!
//! Library code uses thiserror; the binary wraps everything in anyhow.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the blocklog application
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Store errors
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Progress ledger errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Log line parse errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Archive extraction errors
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Query parameter errors
    #[error("Query error: {0}")]
    Compile(#[from] CompileError),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Username has no rows in any partition
    #[error("No entries found for player '{username}'")]
    NotFound { username: String },
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No partitions configured
    #[error("No partition tables configured")]
    NoPartitions,

    /// Partition list could not be read
    #[error("Invalid partition list '{value}': {reason}")]
    InvalidPartitionList { value: String, reason: String },

    /// Partition name unusable as a table name
    #[error("Invalid partition name '{name}': must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidPartitionName { name: String },

    /// Same partition listed twice
    #[error("Partition '{name}' is listed more than once")]
    DuplicatePartition { name: String },

    /// Invalid batch size
    #[error("Invalid batch size {size}: must be between {min} and {max}")]
    InvalidBatchSize { size: usize, min: usize, max: usize },

    /// Invalid page size
    #[error("Invalid page size {size}: must be between {min} and {max}")]
    InvalidPageSize { size: usize, min: usize, max: usize },

    /// Directory setting does not lead to a directory
    #[error("{setting} '{path}' is not a valid directory")]
    InvalidDirectory { setting: &'static str, path: PathBuf },

    /// Output file cannot be created where requested
    #[error("Invalid {setting} path '{path}': {reason}")]
    InvalidFilePath {
        setting: &'static str,
        path: PathBuf,
        reason: String,
    },
}

/// Store errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to open the store file
    #[error("Failed to open database at '{path}': {reason}")]
    OpenFailed { path: PathBuf, reason: String },
}

/// Progress ledger errors
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Reading or writing the ledger file failed
    #[error("Failed to access ledger '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Ledger document is not valid JSON of the expected shape
    #[error("Malformed ledger '{path}': {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Fatal errors while turning raw log text into records
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Date/time did not match `%m/%d/%y %H:%M:%S`
    #[error("line {line}: invalid timestamp '{value}': {reason}")]
    Timestamp {
        line: usize,
        value: String,
        reason: String,
    },

    /// Coordinate did not fit a signed integer
    #[error("line {line}: invalid {field} '{value}'")]
    Number {
        line: usize,
        field: &'static str,
        value: String,
    },

    /// Parse error with the file it came from
    #[error("{path}: {source}")]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<ParseError>,
    },
}

impl ParseError {
    /// Attach the source file path to this error
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            ParseError::InFile { .. } => self,
            other => ParseError::InFile {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }
}

/// Archive extraction errors
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Could not list the archive directory
    #[error("Failed to read archive directory '{path}': {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not unpack one archive
    #[error("Failed to extract '{path}': {reason}")]
    Extract { path: PathBuf, reason: String },
}

/// Errors compiling a query parameter string
///
/// Every variant carries the 1-based position of the offending token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Token is not of the form `key:value`
    #[error("token {position}: expected key:value, got '{token}'")]
    MalformedToken { position: usize, token: String },

    /// Key is not a known parameter
    #[error("token {position}: unknown parameter '{key}'")]
    UnknownKey { position: usize, key: String },

    /// `!` used on a parameter that cannot be negated
    #[error("token {position}: parameter '{key}' cannot be negated")]
    NotNegatable { position: usize, key: String },

    /// Single-valued parameter given twice
    #[error("token {position}: parameter '{key}' may only be given once")]
    Repeated { position: usize, key: String },

    /// Value outside the parameter's domain
    #[error("token {position}: invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        position: usize,
        key: String,
        value: String,
        reason: String,
    },

    /// Recognized action that has no interaction code
    #[error("token {position}: action '{value}' is not supported")]
    UnsupportedAction { position: usize, value: String },
}

impl CompileError {
    /// 1-based position of the token that failed
    pub fn position(&self) -> usize {
        match self {
            CompileError::MalformedToken { position, .. }
            | CompileError::UnknownKey { position, .. }
            | CompileError::NotNegatable { position, .. }
            | CompileError::Repeated { position, .. }
            | CompileError::InvalidValue { position, .. }
            | CompileError::UnsupportedAction { position, .. } => *position,
        }
    }
}

/// Result type alias for AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for DbError
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Result type alias for LedgerError
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Result type alias for ParseError
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Result type alias for ArchiveError
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;

/// Result type alias for CompileError
pub type CompileResult<T> = std::result::Result<T, CompileError>;
