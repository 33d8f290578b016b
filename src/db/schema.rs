//! Partition table definitions and store setup
//!
//! Every partition gets its own table with an identical schema. The
//! UNIQUE constraint over the event tuple is what makes re-ingesting a
//! file harmless: duplicate rows are dropped by `INSERT OR IGNORE`.

use crate::error::{DbError, DbResult};
use rusqlite::Connection;
use std::path::Path;

/// Columns in insert order
pub const COLUMNS: &str =
    "x, y, z, interaction, username, lower_username, uuid, unix_time, block";

/// SQLite pragmas for ingestion
const STORE_PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA cache_size = -64000;      -- 64MB cache
PRAGMA temp_store = MEMORY;
"#;

/// Quote a partition name for use as an SQL identifier
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(partition: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
    x INTEGER NOT NULL,
    y INTEGER NOT NULL,
    z INTEGER NOT NULL,
    interaction TEXT NOT NULL,
    username TEXT NOT NULL,
    lower_username TEXT NOT NULL,
    uuid TEXT,
    unix_time INTEGER NOT NULL,
    block TEXT,
    UNIQUE (x, y, z, interaction, username, unix_time, block)
)
"#,
        table = quote_ident(partition)
    )
}

fn create_index_sql(partition: &str) -> [String; 2] {
    let table = quote_ident(partition);
    [
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {table}(lower_username)",
            quote_ident(&format!("idx_{partition}_lower_username"))
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {table}(unix_time)",
            quote_ident(&format!("idx_{partition}_unix_time"))
        ),
    ]
}

/// Open the store file and apply pragmas
pub fn open_store(path: &Path) -> DbResult<Connection> {
    let conn = Connection::open(path).map_err(|e| DbError::OpenFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    conn.execute_batch(STORE_PRAGMAS)?;
    Ok(conn)
}

/// Create a partition table and its indexes if missing
pub fn create_partition_table(conn: &Connection, partition: &str) -> DbResult<()> {
    conn.execute(&create_table_sql(partition), [])?;
    for sql in create_index_sql(partition) {
        conn.execute(&sql, [])?;
    }
    Ok(())
}

/// Create every configured partition table
pub fn create_partition_tables(conn: &Connection, partitions: &[String]) -> DbResult<()> {
    for partition in partitions {
        create_partition_table(conn, partition)?;
    }
    Ok(())
}

/// Number of rows in one partition
pub fn count_rows(conn: &Connection, partition: &str) -> DbResult<u64> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(partition));
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(count as u64)
}
