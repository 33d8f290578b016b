//! Query execution
//!
//! Runs a [`SearchQuery`] against the store one page at a time and maps
//! rows into [`LogRow`]s.

use crate::error::DbResult;
use crate::query::builder::SearchQuery;
use chrono::DateTime;
use rusqlite::{params_from_iter, Connection, Row};
use std::fmt;

/// One stored event as returned by a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRow {
    pub world: String,
    pub x: i64,
    pub y: i64,
    pub z: i64,
    pub interaction: String,
    pub username: String,
    pub unix_time: i64,
    pub block: Option<String>,
}

impl LogRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            world: row.get(0)?,
            x: row.get(1)?,
            y: row.get(2)?,
            z: row.get(3)?,
            interaction: row.get(4)?,
            username: row.get(5)?,
            unix_time: row.get(6)?,
            block: row.get(7)?,
        })
    }

    /// Timestamp as `YYYY-MM-DD HH:MM:SS` (UTC)
    pub fn time_string(&self) -> String {
        match DateTime::from_timestamp(self.unix_time, 0) {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => self.unix_time.to_string(),
        }
    }
}

impl fmt::Display for LogRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} '{}' {} at {} {} {} ({})",
            self.time_string(),
            self.username,
            self.interaction,
            self.block.as_deref().unwrap_or("-"),
            self.x,
            self.y,
            self.z,
            self.world
        )
    }
}

/// One page of search results
#[derive(Debug, Clone)]
pub struct Page {
    pub rows: Vec<LogRow>,
    /// 0-based page index
    pub page: usize,
    pub page_size: usize,
    /// Rows matching the whole search
    pub total_rows: u64,
}

impl Page {
    /// Number of pages needed for all matching rows
    pub fn total_pages(&self) -> usize {
        total_pages(self.total_rows, self.page_size)
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 0
    }
}

/// Number of pages of `page_size` rows needed for `total` rows
pub fn total_pages(total: u64, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size as u64) as usize
}

/// Count every row matching the search
pub fn count_matches(conn: &Connection, query: &SearchQuery) -> DbResult<u64> {
    if query.is_empty() {
        return Ok(0);
    }
    let count: i64 = conn.query_row(
        &query.count_sql(),
        params_from_iter(query.values().iter()),
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Fetch rows for one page (0-based)
pub fn fetch_rows(
    conn: &Connection,
    query: &SearchQuery,
    page: usize,
    page_size: usize,
) -> DbResult<Vec<LogRow>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(&query.page_sql())?;
    let rows = stmt
        .query_map(
            params_from_iter(query.page_values(page, page_size).iter()),
            LogRow::from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Fetch one page together with the total count
pub fn fetch_page(
    conn: &Connection,
    query: &SearchQuery,
    page: usize,
    page_size: usize,
) -> DbResult<Page> {
    Ok(Page {
        rows: fetch_rows(conn, query, page, page_size)?,
        page,
        page_size,
        total_rows: count_matches(conn, query)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_partition_tables, BatchWriter};
    use crate::query::builder::Center;
    use crate::query::params::{compile, CompileContext};
    use crate::record::LogRecord;

    fn partitions() -> Vec<String> {
        vec!["overworld".into(), "nether".into()]
    }

    fn record(x: i64, y: i64, z: i64, kind: char, user: &str, block: &str, t: i64) -> LogRecord {
        LogRecord {
            x,
            y,
            z,
            interaction: kind,
            username: user.into(),
            block: block.into(),
            unix_time: t,
        }
    }

    fn store() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_partition_tables(&conn, &partitions()).unwrap();

        let mut w = BatchWriter::new(&conn, "overworld", 100);
        w.stage(record(1, 1, 1, 'b', "Steve", "stone", 100)).unwrap();
        w.stage(record(2, 2, 2, 'b', "Steve", "stone", 200)).unwrap();
        w.stage(record(0, 1, 0, 'p', "Alex", "dirt", 300)).unwrap();
        w.stage(record(-1, 0, 0, 'p', "steve", "stone", 400)).unwrap();
        w.finish().unwrap();

        let mut w = BatchWriter::new(&conn, "nether", 100);
        w.stage(record(0, 0, 1, 'b', "Alex", "netherrack", 500)).unwrap();
        w.finish().unwrap();

        conn
    }

    fn search(conn: &Connection, center: Center, input: &str) -> Vec<LogRow> {
        let parts = partitions();
        let ctx = CompileContext { partitions: &parts, now: 1_000 };
        let params = compile(input, &ctx).unwrap();
        let query = SearchQuery::build(center, &params, &parts);
        fetch_rows(conn, &query, 0, 100).unwrap()
    }

    #[test]
    fn test_proximity_predicate() {
        let conn = store();
        let rows = search(&conn, Center::new(0, 0, 0), "range:2");
        let coords: Vec<_> = rows.iter().map(|r| (r.x, r.y, r.z)).collect();

        assert!(coords.contains(&(1, 1, 1)));
        assert!(!coords.contains(&(2, 2, 2)));
    }

    #[test]
    fn test_ordered_newest_first() {
        let conn = store();
        let rows = search(&conn, Center::new(0, 0, 0), "range:2");
        let times: Vec<_> = rows.iter().map(|r| r.unix_time).collect();
        assert_eq!(times, vec![500, 400, 300, 100]);
        assert_eq!(rows[0].world, "nether");
    }

    #[test]
    fn test_default_range_is_one() {
        let conn = store();
        let rows = search(&conn, Center::new(0, 0, 0), "");
        let times: Vec<_> = rows.iter().map(|r| r.unix_time).collect();
        assert_eq!(times, vec![500, 400, 300]);
    }

    #[test]
    fn test_filters() {
        let conn = store();
        let center = Center::new(0, 0, 0);

        let rows = search(&conn, center, "range:5 source:STEVE");
        assert_eq!(rows.len(), 3);

        let rows = search(&conn, center, "range:5 !source:steve");
        assert!(rows.iter().all(|r| r.username == "Alex"));

        let rows = search(&conn, center, "range:5 object:minecraft:stone action:block-place");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].unix_time, 400);

        // Positive values of the same kind narrow
        let rows = search(&conn, center, "range:5 action:block-place action:block-break");
        assert!(rows.is_empty());

        let rows = search(&conn, center, "range:5 world:nether");
        assert_eq!(rows.len(), 1);

        let rows = search(&conn, center, "range:5 world:nether world:overworld");
        assert_eq!(rows.len(), 5);
    }

    #[test]
    fn test_time_bounds_inclusive() {
        let conn = store();
        // now = 1000; before:10m -> <= 400, after:15m -> >= 100
        let rows = search(&conn, Center::new(0, 0, 0), "range:5 before:10m after:15m");
        let times: Vec<_> = rows.iter().map(|r| r.unix_time).collect();
        assert_eq!(times, vec![400, 300, 200, 100]);
    }

    #[test]
    fn test_pagination() {
        let conn = store();
        let parts = partitions();
        let query = SearchQuery::build(Center::new(0, 0, 0), &[], &parts);

        let first = fetch_page(&conn, &query, 0, 2).unwrap();
        assert_eq!(first.total_rows, 3);
        assert_eq!(first.total_pages(), 2);
        assert_eq!(first.rows.len(), 2);
        assert!(first.has_next());
        assert!(!first.has_prev());

        let second = fetch_page(&conn, &query, 1, 2).unwrap();
        assert_eq!(second.rows.len(), 1);
        assert_eq!(second.rows[0].unix_time, 300);
        assert!(!second.has_next());
    }

    #[test]
    fn test_all_worlds_excluded() {
        let conn = store();
        let rows = search(&conn, Center::new(0, 0, 0), "!world:nether !world:overworld");
        assert!(rows.is_empty());
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }
}
