//! Log line parser
//!
//! Extracts [`LogRecord`]s from raw log text. Each event has the shape
//!
//! ```text
//! X#Y#Z#KIND#ACTOR#MM/DD/YY HH:MM:SS#SUBJECT
//! ```
//!
//! Matching is a substring search: text around and between events that
//! does not fit the grammar is skipped. A match whose timestamp or
//! coordinates cannot be converted is fatal for the whole file.
//!
//! Timestamps are UTC. Two-digit years `69`-`99` fall in 1969-1999 and
//! `00`-`68` in 2000-2068, the POSIX `%y` rule.

use crate::error::{ParseError, ParseResult};
use crate::record::{strip_namespace, LogRecord};
use chrono::NaiveDateTime;
use regex::{CaptureMatches, Captures, Regex};
use std::sync::LazyLock;

/// Date and time format after the year has been widened to four digits
const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// First two-digit year read as 19xx
const CENTURY_PIVOT: u32 = 69;

/// Event grammar. Free-text fields never cross a line break.
static LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(-?\d+)#(-?\d+)#(-?\d+)#(\w)#([^#\r\n]*)#(\d{2}/\d{2}/\d{2}) (\d{2}:\d{2}:\d{2})#([^#,\]\r\n]*)",
    )
    .expect("Invalid log line regex")
});

/// Parse all records in `text`
///
/// The returned iterator is lazy; calling this again on the same text
/// starts a fresh pass. After the first error the iterator is exhausted.
pub fn parse_records(text: &str) -> RecordParser<'_> {
    RecordParser {
        matches: LINE_REGEX.captures_iter(text),
        text,
        line: 1,
        scanned: 0,
        failed: false,
    }
}

/// Lazy iterator over the records of one text
pub struct RecordParser<'t> {
    matches: CaptureMatches<'static, 't>,
    text: &'t str,
    /// Line number at byte offset `scanned`
    line: usize,
    scanned: usize,
    failed: bool,
}

impl<'t> RecordParser<'t> {
    fn line_at(&mut self, offset: usize) -> usize {
        self.line += self.text[self.scanned..offset].matches('\n').count();
        self.scanned = offset;
        self.line
    }
}

impl Iterator for RecordParser<'_> {
    type Item = ParseResult<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let caps = self.matches.next()?;
        let start = caps.get(0).map(|m| m.start()).unwrap_or(self.scanned);
        let line = self.line_at(start);

        let result = record_from_captures(&caps, line);
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

fn record_from_captures(caps: &Captures<'_>, line: usize) -> ParseResult<LogRecord> {
    let field = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or_default();

    let coord = |i: usize, name: &'static str| -> ParseResult<i64> {
        field(i).parse::<i64>().map_err(|_| ParseError::Number {
            line,
            field: name,
            value: field(i).to_string(),
        })
    };

    let stamp = format!("{} {}", field(6), field(7));
    let unix_time = NaiveDateTime::parse_from_str(&widen_year(field(6), field(7)), TIMESTAMP_FORMAT)
        .map_err(|e| ParseError::Timestamp {
            line,
            value: stamp.clone(),
            reason: e.to_string(),
        })?
        .and_utc()
        .timestamp();

    Ok(LogRecord {
        x: coord(1, "x")?,
        y: coord(2, "y")?,
        z: coord(3, "z")?,
        interaction: field(4).chars().next().unwrap_or_default(),
        username: field(5).to_string(),
        block: strip_namespace(field(8)).to_string(),
        unix_time,
    })
}

/// `MM/DD/YY` + `HH:MM:SS` to `MM/DD/YYYY HH:MM:SS`
fn widen_year(date: &str, time: &str) -> String {
    let (month_day, yy) = date.rsplit_once('/').unwrap_or((date, ""));
    match yy.parse::<u32>() {
        Ok(yy) => {
            let century = if yy >= CENTURY_PIVOT { 1900 } else { 2000 };
            format!("{}/{} {}", month_day, century + yy, time)
        }
        // Left for chrono to reject
        Err(_) => format!("{} {}", date, time),
    }
}
