//! Run statistics
//!
//! Condenses a [`RunResult`] into the figures shown at the end of a run.

use crate::pipeline::{RunResult, StopReason};
use std::path::Path;

/// Run statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct RunStatistics {
    /// Pages that yielded at least one listing
    pub pages_fetched: u32,

    /// Pages that came back with a 2xx response
    pub pages_requested: u32,

    /// Total records collected
    pub records: usize,

    /// Records with every field present
    pub complete_records: usize,

    /// Field-level misses absorbed as empty values
    pub extraction_failures: u32,

    /// Pages whose body could not be read as markup
    pub parse_failures: u32,

    pub stop_reason: StopReason,

    /// Message of the fetch failure that ended the run
    pub error: Option<String>,

    pub duration_ms: i64,
}

impl RunStatistics {
    pub fn from_result(result: &RunResult) -> Self {
        Self {
            pages_fetched: result.pages_fetched,
            pages_requested: result.pages_requested,
            records: result.records.len(),
            complete_records: result
                .records
                .iter()
                .filter(|record| record.missing_fields() == 0)
                .count(),
            extraction_failures: result.extraction_failures,
            parse_failures: result.parse_failures,
            stop_reason: result.stop_reason,
            error: result.error.as_ref().map(|e| e.to_string()),
            duration_ms: result.duration().num_milliseconds(),
        }
    }

    /// Share of records with every field present, in percent
    pub fn completeness(&self) -> f64 {
        if self.records == 0 {
            return 0.0;
        }
        (self.complete_records as f64 / self.records as f64) * 100.0
    }
}

/// Prints the run summary to stdout
///
/// # Arguments
///
/// * `result` - The finished run
/// * `written_to` - Where the records were written, if they were
pub fn print_run_summary(result: &RunResult, written_to: Option<&Path>) {
    let stats = RunStatistics::from_result(result);

    println!("=== Run Summary ===\n");
    println!("Start URL: {}", result.start_url);
    println!("  Pages fetched: {}", stats.pages_fetched);
    println!("  Pages requested: {}", stats.pages_requested);
    println!("  Records: {}", stats.records);
    println!(
        "  Complete records: {} ({:.1}%)",
        stats.complete_records,
        stats.completeness()
    );
    println!("  Extraction failures: {}", stats.extraction_failures);
    println!("  Parse failures: {}", stats.parse_failures);
    println!("  Stopped: {}", stats.stop_reason);
    if let Some(error) = &stats.error {
        println!("  Error: {}", error);
    }
    println!("  Duration: {:.1}s", stats.duration_ms as f64 / 1000.0);

    match written_to {
        Some(path) => println!("\n✓ Records written to: {}", path.display()),
        None => println!("\n✗ Records were not written"),
    }
}
