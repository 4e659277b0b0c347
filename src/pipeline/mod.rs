//! Extraction pipeline
//!
//! This module contains the core scraping logic, including:
//! - HTTP fetching with retry and backoff
//! - HTML parsing and listing detection
//! - Per-field record extraction with fallback strategies
//! - Pagination across result pages
//! - The page loop that ties them together

mod controller;
mod extractor;
mod fetcher;
mod numbers;
mod paginator;
mod parser;
mod retry;
mod types;

pub use controller::Pipeline;
pub use extractor::RecordExtractor;
pub use fetcher::{build_http_client, retry_policy, FetchedPage, Fetcher};
pub use numbers::{parse_decimal, parse_integer};
pub use paginator::{DoneReason, NextRequest, PageRequestState, PageStep, Paginator};
pub use parser::{parse_page, ListingSelectors, NextPageLink, ParsedPage};
pub use retry::RetryPolicy;
pub use types::{HotelRecord, PageReport, RunResult, StopReason};

use crate::config::Config;
use crate::HarvestError;

/// Runs a complete extraction from one start URL
///
/// This is the main entry point for a single run. It will:
/// 1. Compile the configured selectors and build the HTTP client
/// 2. Fetch the start page and every following page
/// 3. Extract one record per listing block
/// 4. Stop on an empty page, the page limit, a missing next-page control,
///    or a fetch failure
///
/// Writing the records is left to [`crate::output::write_records`].
///
/// # Returns
///
/// * `Ok(RunResult)` - The run's records and counts, possibly partial
/// * `Err(HarvestError)` - The configuration or start URL was invalid
pub async fn run(config: &Config, start_url: &str) -> Result<RunResult, HarvestError> {
    Pipeline::new(config)?.run(start_url).await
}
