//! blocklog - Block Log Ingestion and Query Tool
//!
//! Loads game-server block interaction logs into SQLite and answers
//! "who did what near here, and when" questions from an interactive shell.
//!
//! # Features
//!
//! - **Incremental Ingestion**: A JSON progress ledger records every file
//!   that was fully ingested, so interrupted runs resume where they stopped.
//!
//! - **Idempotent Storage**: A uniqueness constraint over every stored field
//!   turns repeated ingestion of the same lines into a no-op.
//!
//! - **Partitioned Tables**: One table per world, each with indexes on the
//!   lowercase actor name and the event time.
//!
//! - **Query Compiler**: `key:value` parameters with negation and repetition
//!   rules are compiled into one parameterized proximity/time query.
//!
//! # Architecture
//!
//! ```text
//!   archives (.tar / .tar.gz)
//!            │
//!            │ ArchiveExtractor
//!            ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Ingestor                                  │
//! │  for each partition, for each file not in the ledger:            │
//! │                                                                  │
//! │   parser::parse_records ──▶ BatchWriter ──▶ ledger.mark_done     │
//! │   (line regex, UTC time)    (INSERT OR IGNORE,                   │
//! │                              N rows per transaction)             │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │
//!                               ▼
//!                    ┌──────────────────┐
//!                    │   SQLite store   │
//!                    │ one table/world  │
//!                    └────────┬─────────┘
//!                             │
//!                             ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Shell ──▶ query::parse_query_line ──▶ SearchQuery ──▶ Page      │
//! │        ──▶ player_summary / overview                             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Extract and ingest
//! blocklog --db logs.db --tables overworld,nether ingest \
//!     --zip-dir ./archives --extract-dir ./extracted --progress-log progress.json
//!
//! # Search interactively
//! blocklog --db logs.db --tables overworld,nether query
//! ```

pub mod archive;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod ledger;
pub mod parser;
pub mod progress;
pub mod query;
pub mod record;
pub mod shell;

pub use config::{CliArgs, Command, IngestConfig, Settings};
pub use error::{AppError, Result};
pub use ingest::{IngestSummary, Ingestor};
pub use record::{Interaction, LogRecord};
pub use shell::Shell;
