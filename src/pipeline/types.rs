//! Records and run results produced by the pipeline

use crate::{FetchError, ParseError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One hotel listing as extracted from a search-results page
///
/// Every field is optional: a listing block always yields a record, and a
/// field that could not be found or coerced is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotelRecord {
    pub name: Option<String>,
    pub location: Option<String>,
    /// Guest rating in the range 0.0 to 10.0
    pub review_score: Option<f64>,
    pub review_count: Option<u64>,
    /// Display price, currency symbol included
    pub price: Option<String>,
}

impl HotelRecord {
    /// Number of fields that are `None`
    pub fn missing_fields(&self) -> u32 {
        [
            self.name.is_none(),
            self.location.is_none(),
            self.review_score.is_none(),
            self.review_count.is_none(),
            self.price.is_none(),
        ]
        .into_iter()
        .filter(|missing| *missing)
        .count() as u32
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Pagination ended: an empty page or no next-page affordance
    NormalDone,

    /// A fetch failed after retries; earlier records are kept
    FetchFailed,

    /// The configured page limit was reached
    MaxPagesReached,

    /// The caller requested a stop between pages
    Cancelled,

    /// The configured run deadline passed between pages
    DeadlineReached,
}

impl StopReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::FetchFailed)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NormalDone => "done",
            Self::FetchFailed => "fetch failed",
            Self::MaxPagesReached => "max pages reached",
            Self::Cancelled => "cancelled",
            Self::DeadlineReached => "deadline reached",
        };
        f.write_str(label)
    }
}

/// Outcome of a single page in the run
#[derive(Debug, Clone)]
pub struct PageReport {
    /// 1-based page index
    pub page_index: u32,
    pub url: String,
    /// HTTP status, absent when the fetch failed
    pub status_code: Option<u16>,
    pub fragment_count: usize,
    pub elapsed: Duration,
    /// Set when the body could not be read as markup
    pub parse_error: Option<ParseError>,
}

/// Everything a run produced, in page order then listing order
#[derive(Debug, Clone)]
pub struct RunResult {
    pub start_url: String,
    pub records: Vec<HotelRecord>,
    /// Pages that were fetched and yielded at least one listing
    pub pages_fetched: u32,
    /// Every page that came back with a 2xx response
    pub pages_requested: u32,
    /// Field-level misses absorbed as `None`
    pub extraction_failures: u32,
    /// Pages whose body could not be read as markup
    pub parse_failures: u32,
    pub stop_reason: StopReason,
    /// The fetch failure that ended the run, if any
    pub error: Option<FetchError>,
    pub pages: Vec<PageReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    pub(crate) fn start(start_url: &str) -> Self {
        let now = Utc::now();
        Self {
            start_url: start_url.to_string(),
            records: Vec::new(),
            pages_fetched: 0,
            pages_requested: 0,
            extraction_failures: 0,
            parse_failures: 0,
            stop_reason: StopReason::NormalDone,
            error: None,
            pages: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    pub(crate) fn finish(mut self, stop_reason: StopReason) -> Self {
        self.stop_reason = stop_reason;
        self.finished_at = Utc::now();
        self
    }

    /// True if at least one page came back successfully
    pub fn any_page_fetched(&self) -> bool {
        self.pages_requested > 0
    }

    /// Wall-clock duration of the run
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
