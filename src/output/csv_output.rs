//! Delimited (CSV) record output
//!
//! One header row, then one row per record in run order. Missing fields are
//! empty cells.

use crate::output::traits::{write_atomically, OutputError, OutputResult, RecordSink};
use crate::pipeline::HotelRecord;
use std::path::Path;

/// Fixed header row
pub const CSV_HEADER: [&str; 5] = [
    "Hotel Name",
    "Location",
    "Review Score",
    "Number of Reviews",
    "Price",
];

/// Writes records as UTF-8 CSV
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvSink;

impl CsvSink {
    fn row(record: &HotelRecord) -> [String; 5] {
        [
            record.name.clone().unwrap_or_default(),
            record.location.clone().unwrap_or_default(),
            record
                .review_score
                .map(|score| score.to_string())
                .unwrap_or_default(),
            record
                .review_count
                .map(|count| count.to_string())
                .unwrap_or_default(),
            record.price.clone().unwrap_or_default(),
        ]
    }
}

impl RecordSink for CsvSink {
    fn write(&self, records: &[HotelRecord], destination: &Path) -> OutputResult<()> {
        write_atomically(destination, |out| {
            let mut writer = csv::Writer::from_writer(out);
            writer
                .write_record(CSV_HEADER)
                .map_err(|e| OutputError::from_csv(destination, e))?;
            for record in records {
                writer
                    .write_record(Self::row(record))
                    .map_err(|e| OutputError::from_csv(destination, e))?;
            }
            writer
                .flush()
                .map_err(|e| OutputError::from_io(destination, e))
        })?;

        tracing::info!(
            path = %destination.display(),
            rows = records.len(),
            "CSV written"
        );
        Ok(())
    }

    fn extension(&self) -> &'static str {
        "csv"
    }
}

/// Reads a file written by [`CsvSink`] back into records
///
/// Empty cells become `None`; numeric cells that do not parse become `None`.
pub fn read_csv_records(path: &Path) -> OutputResult<Vec<HotelRecord>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| OutputError::from_csv(path, e))?;

    reader
        .records()
        .map(|row| -> OutputResult<HotelRecord> {
            let row = row.map_err(|e| OutputError::from_csv(path, e))?;
            let cell = |index: usize| {
                row.get(index)
                    .filter(|value| !value.is_empty())
                    .map(str::to_string)
            };
            Ok(HotelRecord {
                name: cell(0),
                location: cell(1),
                review_score: cell(2).and_then(|v| v.parse().ok()),
                review_count: cell(3).and_then(|v| v.parse().ok()),
                price: cell(4),
            })
        })
        .collect()
}
