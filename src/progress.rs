//! Progress reporting for ingestion
//!
//! Provides a per-partition progress bar and the banners printed before
//! and after a run, using indicatif and console.

use crate::ingest::IngestSummary;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Progress reporter for one partition's files
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a bar over `total` files; hidden when `visible` is false
    pub fn new(partition: &str, total: u64, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(total)
        } else {
            ProgressBar::hidden()
        };

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:.cyan.bold} [{elapsed_precise}] {bar:30.green/dim} {pos}/{len} {msg}")
                .expect("Invalid progress template")
                .progress_chars("=> "),
        );
        bar.set_prefix(partition.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Show which file is being parsed
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// One file done
    pub fn inc(&self) {
        self.bar.inc(1);
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

/// Row and file counts with `,` between digit groups
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Print a header at the start of an ingestion run
pub fn print_header(source: &Path, partitions: &[String], db_path: &Path) {
    println!();
    println!(
        "{} {}",
        style("blocklog").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Source:").bold(), source.display());
    println!("  {} {}", style("Partitions:").bold(), partitions.join(", "));
    println!("  {} {}", style("Database:").bold(), db_path.display());
    println!();
}

/// Print a summary of the ingestion run
pub fn print_summary(summary: &IngestSummary, db_path: &Path) {
    let duration_secs = summary.duration.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        summary.writes.rows_attempted as f64 / duration_secs
    } else {
        0.0
    };

    println!();
    println!("{}", style("Ingestion Complete").green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {} entries to {} tables",
        style("Added:").bold(),
        format_number(summary.writes.rows_added),
        summary.partitions
    );

    println!(
        "  {} {} entries",
        style("Attempted:").bold(),
        format_number(summary.writes.rows_attempted)
    );

    let duplicates = summary.writes.duplicates();
    if duplicates > 0 {
        println!(
            "  {} {} duplicate entries",
            style("Skipped:").yellow().bold(),
            format_number(duplicates)
        );
    } else {
        println!("  {} 0 duplicate entries", style("Skipped:").bold());
    }

    println!(
        "  {} {} parsed, {} already done",
        style("Files:").bold(),
        format_number(summary.files_parsed),
        format_number(summary.files_skipped)
    );
    println!(
        "  {} {}",
        style("Batches:").bold(),
        format_number(summary.writes.batches_committed)
    );
    println!(
        "  {} {:.1}s ({:.0} records/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );

    match std::fs::metadata(db_path) {
        Ok(meta) => println!(
            "  {} {} ({})",
            style("Database:").bold(),
            db_path.display(),
            format_size(meta.len(), BINARY)
        ),
        Err(_) => println!("  {} {}", style("Database:").bold(), db_path.display()),
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(100_000), "100,000");
        assert_eq!(format_number(u64::MAX), "18,446,744,073,709,551,615");
    }
}
