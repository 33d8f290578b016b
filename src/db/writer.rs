//! Batched insert-ignore writer
//!
//! Records are staged into an in-memory batch bound to one partition
//! table. When the batch reaches the configured size it is written in a
//! single transaction with `INSERT OR IGNORE`, so rows already present
//! are dropped silently. Any other SQLite failure is returned to the
//! caller and ends the run.

use crate::db::schema::{quote_ident, COLUMNS};
use crate::error::DbResult;
use crate::record::LogRecord;
use rusqlite::{params, Connection};
use tracing::{debug, trace};

/// Counters for one writer (or summed across writers)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriterStats {
    /// Records handed to the store
    pub rows_attempted: u64,

    /// Records the store actually inserted
    pub rows_added: u64,

    /// Transactions committed
    pub batches_committed: u64,
}

impl WriterStats {
    /// Records dropped by the uniqueness constraint
    pub fn duplicates(&self) -> u64 {
        self.rows_attempted - self.rows_added
    }

    /// Add another writer's counters
    pub fn merge(&mut self, other: &WriterStats) {
        self.rows_attempted += other.rows_attempted;
        self.rows_added += other.rows_added;
        self.batches_committed += other.batches_committed;
    }
}

/// Batch writer for one partition table
pub struct BatchWriter<'c> {
    conn: &'c Connection,
    insert_sql: String,
    batch: Vec<LogRecord>,
    batch_size: usize,
    stats: WriterStats,
}

impl<'c> BatchWriter<'c> {
    /// Create a writer targeting `partition`'s table
    ///
    /// `batch_size` is the number of pending records that triggers a
    /// flush; values below 1 are treated as 1.
    pub fn new(conn: &'c Connection, partition: &str, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        let insert_sql = format!(
            "INSERT OR IGNORE INTO {} ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?8)",
            quote_ident(partition)
        );

        Self {
            conn,
            insert_sql,
            batch: Vec::with_capacity(batch_size),
            batch_size,
            stats: WriterStats::default(),
        }
    }

    /// Stage a record; the batch is flushed as soon as it holds
    /// `batch_size` records
    pub fn stage(&mut self, record: LogRecord) -> DbResult<()> {
        trace!(%record, "Staged");
        self.batch.push(record);

        if self.batch.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Write the pending batch in one transaction; returns rows added
    pub fn flush(&mut self) -> DbResult<u64> {
        if self.batch.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        let attempted = self.batch.len() as u64;
        let mut added = 0u64;

        {
            let mut stmt = tx.prepare_cached(&self.insert_sql)?;

            for record in self.batch.drain(..) {
                added += stmt.execute(params![
                    record.x,
                    record.y,
                    record.z,
                    record.interaction.to_string(),
                    record.username,
                    record.lower_username(),
                    record.unix_time,
                    record.block,
                ])? as u64;
            }
        }

        tx.commit()?;

        self.stats.rows_attempted += attempted;
        self.stats.rows_added += added;
        self.stats.batches_committed += 1;

        debug!(
            batch = self.stats.batches_committed,
            attempted, added, "Batch committed"
        );

        Ok(added)
    }

    /// Flush the remainder and return final counters
    pub fn finish(mut self) -> DbResult<WriterStats> {
        self.flush()?;
        Ok(self.stats)
    }

    /// Records waiting for the next flush
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// Counters so far
    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::{count_rows, create_partition_table};

    fn record(i: i64) -> LogRecord {
        LogRecord {
            x: i,
            y: 64,
            z: -i,
            interaction: 'p',
            username: "Steve".into(),
            block: "stone".into(),
            unix_time: 1_700_000_000 + i,
        }
    }

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_partition_table(&conn, "overworld").unwrap();
        conn
    }

    #[test]
    fn test_writer_flushes_at_batch_size() {
        let conn = setup();
        let mut writer = BatchWriter::new(&conn, "overworld", 4);

        for i in 0..10 {
            writer.stage(record(i)).unwrap();
        }
        assert_eq!(writer.stats().batches_committed, 2);
        assert_eq!(writer.pending(), 2);

        let stats = writer.finish().unwrap();
        assert_eq!(stats.batches_committed, 3);
        assert_eq!(stats.rows_added, 10);
        assert_eq!(count_rows(&conn, "overworld").unwrap(), 10);
    }

    #[test]
    fn test_writer_flush_point() {
        let conn = setup();
        let mut writer = BatchWriter::new(&conn, "overworld", 3);

        writer.stage(record(0)).unwrap();
        writer.stage(record(1)).unwrap();
        assert_eq!(writer.pending(), 2);
        assert_eq!(writer.stats().batches_committed, 0);

        writer.stage(record(2)).unwrap();
        assert_eq!(writer.pending(), 0);
        assert_eq!(writer.stats().batches_committed, 1);
        assert_eq!(writer.stats().rows_added, 3);
    }

    #[test]
    fn test_writer_ignores_duplicates() {
        let conn = setup();

        let mut first = BatchWriter::new(&conn, "overworld", 100);
        for i in 0..5 {
            first.stage(record(i)).unwrap();
        }
        first.finish().unwrap();

        let mut second = BatchWriter::new(&conn, "overworld", 100);
        for i in 3..8 {
            second.stage(record(i)).unwrap();
        }
        let stats = second.finish().unwrap();

        assert_eq!(stats.rows_attempted, 5);
        assert_eq!(stats.rows_added, 3);
        assert_eq!(stats.duplicates(), 2);
        assert_eq!(count_rows(&conn, "overworld").unwrap(), 8);
    }

    #[test]
    fn test_writer_stores_lower_username() {
        let conn = setup();
        let mut writer = BatchWriter::new(&conn, "overworld", 10);
        writer.stage(record(1)).unwrap();
        writer.finish().unwrap();

        let (lower, uuid): (String, Option<String>) = conn
            .query_row("SELECT lower_username, uuid FROM overworld", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(lower, "steve");
        assert_eq!(uuid, None);
    }

    #[test]
    fn test_writer_missing_table_fails() {
        let conn = Connection::open_in_memory().unwrap();
        let mut writer = BatchWriter::new(&conn, "nether", 10);
        writer.stage(record(1)).unwrap();
        assert!(writer.flush().is_err());
    }

    #[test]
    fn test_stats_merge() {
        let mut total = WriterStats::default();
        total.merge(&WriterStats {
            rows_attempted: 4,
            rows_added: 3,
            batches_committed: 1,
        });
        total.merge(&WriterStats {
            rows_attempted: 2,
            rows_added: 2,
            batches_committed: 1,
        });
        assert_eq!(total.rows_attempted, 6);
        assert_eq!(total.duplicates(), 1);
    }
}
