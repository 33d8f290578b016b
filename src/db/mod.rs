//! SQLite storage for parsed log records
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Ingestion pipeline                     │
//! │  - one BatchWriter per (file, partition)            │
//! └─────────────────────┬───────────────────────────────┘
//!                       │ stage(LogRecord)
//!                       ▼
//! ┌─────────────────────────────────────────────────────┐
//! │              BatchWriter                            │
//! │  - Buffers records in memory                        │
//! │  - INSERT OR IGNORE per batch, one transaction      │
//! └─────────────────────┬───────────────────────────────┘
//!                       │
//!                       ▼
//! ┌─────────────────────────────────────────────────────┐
//! │   SQLite file: one table per partition              │
//! │   UNIQUE(x, y, z, interaction, username,            │
//! │          unix_time, block)                          │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod schema;
pub mod writer;

pub use schema::{count_rows, create_partition_table, create_partition_tables, open_store, quote_ident};
pub use writer::{BatchWriter, WriterStats};
