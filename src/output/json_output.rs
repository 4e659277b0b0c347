//! JSON record output
//!
//! Writes the records as a pretty-printed JSON array. Missing fields are
//! `null`, which is the JSON convention rather than an empty string.

use crate::output::traits::{write_atomically, OutputError, OutputResult, RecordSink};
use crate::pipeline::HotelRecord;
use std::io::Write;
use std::path::Path;

/// Writes records as a JSON array
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSink;

impl RecordSink for JsonSink {
    fn write(&self, records: &[HotelRecord], destination: &Path) -> OutputResult<()> {
        write_atomically(destination, |out| {
            serde_json::to_writer_pretty(&mut *out, records)?;
            out.write_all(b"\n")
                .map_err(|e| OutputError::from_io(destination, e))
        })?;

        tracing::info!(
            path = %destination.display(),
            records = records.len(),
            "JSON written"
        );
        Ok(())
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}
