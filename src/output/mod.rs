//! Output module for writing extracted records
//!
//! This module handles:
//! - Serializing records as CSV (the default) or JSON
//! - Replacing the destination file atomically on every run
//! - Summarizing a finished run

mod csv_output;
mod json_output;
pub mod stats;
mod traits;

pub use csv_output::{read_csv_records, CsvSink, CSV_HEADER};
pub use json_output::JsonSink;
pub use stats::{print_run_summary, RunStatistics};
pub use traits::{OutputError, OutputResult, RecordSink};

use crate::pipeline::HotelRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Serialization format of the output file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    /// Returns the sink that writes this format
    pub fn sink(&self) -> Box<dyn RecordSink> {
        match self {
            Self::Csv => Box::new(CsvSink),
            Self::Json => Box::new(JsonSink),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{}' (expected csv or json)", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => f.write_str("csv"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Writes the records of a run to `path`
///
/// The whole file is replaced. An empty record list still produces a valid
/// file: a header-only CSV or an empty JSON array.
///
/// # Arguments
///
/// * `records` - Records in run order
/// * `path` - Destination file
/// * `format` - Serialization format
///
/// # Returns
///
/// * `Ok(())` - The file was written completely
/// * `Err(OutputError)` - Nothing was written; any previous file is intact
pub fn write_records(records: &[HotelRecord], path: &Path, format: OutputFormat) -> OutputResult<()> {
    let sink = format.sink();

    let extension = path.extension().and_then(|ext| ext.to_str());
    if !extension.is_some_and(|ext| ext.eq_ignore_ascii_case(sink.extension())) {
        tracing::warn!(
            path = %path.display(),
            format = %format,
            "Output file extension does not match the output format"
        );
    }

    sink.write(records, path)
}
