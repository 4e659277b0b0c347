//! Pipeline controller - the page loop
//!
//! This module drives fetch → parse → extract across result pages:
//! - One page is fully processed before the next fetch starts
//! - A fixed delay follows every successfully fetched page
//! - A fetch failure ends the loop but keeps every record collected so far
//! - Cancellation and the optional run deadline are checked between pages

use crate::config::Config;
use crate::pipeline::extractor::RecordExtractor;
use crate::pipeline::fetcher::Fetcher;
use crate::pipeline::paginator::{DoneReason, PageRequestState, PageStep, Paginator};
use crate::pipeline::parser::{parse_page, ListingSelectors, NextPageLink};
use crate::pipeline::types::{HotelRecord, PageReport, RunResult, StopReason};
use crate::{ConfigError, FetchErrorKind, HarvestError, ParseError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use url::Url;

/// What one page's markup yielded
#[derive(Debug, Default)]
struct PageOutcome {
    records: Vec<HotelRecord>,
    field_misses: u32,
    fragment_count: usize,
    next_link: Option<NextPageLink>,
    parse_error: Option<ParseError>,
}

/// Main pipeline structure
///
/// Holds the compiled selectors, the fetcher and the pacing settings. A
/// pipeline can run any number of start URLs, one after another.
pub struct Pipeline {
    fetcher: Fetcher,
    selectors: ListingSelectors,
    extractor: RecordExtractor,
    paginator: Paginator,
    delay: Duration,
    max_run_time: Option<Duration>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl Pipeline {
    /// Creates a pipeline from a validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Pipeline)` - Selectors compiled and HTTP client built
    /// * `Err(HarvestError)` - A selector, pattern or header was invalid
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        let fetcher = Fetcher::new(&config.scraper, &config.http)?;
        Self::with_fetcher(config, fetcher)
    }

    /// Creates a pipeline around an existing fetcher
    pub fn with_fetcher(config: &Config, fetcher: Fetcher) -> Result<Self, HarvestError> {
        let delay = Duration::try_from_secs_f64(config.scraper.delay_seconds).map_err(|_| {
            ConfigError::Validation(format!(
                "delay_seconds must be a non-negative number of seconds, got {}",
                config.scraper.delay_seconds
            ))
        })?;

        Ok(Self {
            fetcher,
            selectors: ListingSelectors::compile(&config.selectors)?,
            extractor: RecordExtractor::compile(&config.selectors)?,
            paginator: Paginator::new(&config.pagination, config.scraper.max_pages),
            delay,
            max_run_time: config.scraper.max_run_seconds.map(Duration::from_secs),
            shutdown: None,
        })
    }

    /// Stops the run before the next fetch once `shutdown` holds `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Runs the page loop from `start_url`
    ///
    /// Never fails once the URL is valid: fetch failures end the loop and are
    /// attached to the result, parse failures and field misses are counted.
    ///
    /// # Returns
    ///
    /// * `Ok(RunResult)` - Records in page order, counts and the stop reason
    /// * `Err(HarvestError::UrlParse)` - `start_url` is not a valid URL
    pub async fn run(&self, start_url: &str) -> Result<RunResult, HarvestError> {
        let start_url = Url::parse(start_url)?;
        Ok(self.run_url(start_url).await)
    }

    async fn run_url(&self, start_url: Url) -> RunResult {
        let run_started = Instant::now();
        let mut result = RunResult::start(start_url.as_str());
        let mut state = PageRequestState::first(start_url);

        tracing::info!(url = %state.url, "Starting run");

        let stop_reason = loop {
            if self.is_cancelled() {
                tracing::info!(page = state.page_index, "Stop requested, ending run");
                break StopReason::Cancelled;
            }

            if self
                .max_run_time
                .is_some_and(|limit| run_started.elapsed() >= limit)
            {
                tracing::info!(page = state.page_index, "Run deadline reached, ending run");
                break StopReason::DeadlineReached;
            }

            let page_started = Instant::now();
            let page = match self.fetcher.fetch(&state.url).await {
                Ok(page) => page,
                Err(err) => {
                    tracing::error!(
                        url = %state.url,
                        page = state.page_index,
                        error_kind = err.kind.label(),
                        attempts = err.attempts,
                        "Fetch failed, keeping {} record(s) collected so far",
                        result.records.len()
                    );
                    result.pages.push(PageReport {
                        page_index: state.page_index,
                        url: state.url.to_string(),
                        status_code: match err.kind {
                            FetchErrorKind::HttpStatus(code) => Some(code),
                            _ => None,
                        },
                        fragment_count: 0,
                        elapsed: page_started.elapsed(),
                        parse_error: None,
                    });
                    result.error = Some(err);
                    break StopReason::FetchFailed;
                }
            };

            result.pages_requested += 1;
            let outcome = self.process_page(&page.body);
            let elapsed = page_started.elapsed();

            if outcome.fragment_count > 0 {
                result.pages_fetched += 1;
            }
            if let Some(err) = &outcome.parse_error {
                result.parse_failures += 1;
                tracing::warn!(
                    url = %page.final_url,
                    page = state.page_index,
                    content_type = %page.content_type,
                    "{}",
                    err
                );
            }
            result.extraction_failures += outcome.field_misses;
            result.records.extend(outcome.records);

            tracing::info!(
                url = %page.final_url,
                page = state.page_index,
                status = page.status_code,
                fragments = outcome.fragment_count,
                elapsed_ms = elapsed.as_millis() as u64,
                "Page processed"
            );

            result.pages.push(PageReport {
                page_index: state.page_index,
                url: page.final_url.to_string(),
                status_code: Some(page.status_code),
                fragment_count: outcome.fragment_count,
                elapsed,
                parse_error: outcome.parse_error,
            });

            state = PageRequestState {
                url: page.final_url,
                page_index: state.page_index,
                records_so_far: result.records.len(),
            };
            let step = self.paginator.next(
                &state,
                outcome.fragment_count,
                outcome.next_link.as_ref(),
            );

            // Rate bound: every successful page is followed by the delay
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            match step {
                PageStep::Next(next) => {
                    tracing::debug!(url = %next.url, page = next.page_index, "Next page");
                    state = PageRequestState {
                        url: next.url,
                        page_index: next.page_index,
                        records_so_far: state.records_so_far,
                    };
                }
                PageStep::Done(DoneReason::MaxPages) => break StopReason::MaxPagesReached,
                PageStep::Done(reason) => {
                    tracing::debug!(?reason, "Pagination finished");
                    break StopReason::NormalDone;
                }
            }
        };

        let result = result.finish(stop_reason);
        tracing::info!(
            pages_fetched = result.pages_fetched,
            records = result.records.len(),
            extraction_failures = result.extraction_failures,
            stop_reason = %result.stop_reason,
            "Run finished"
        );
        result
    }

    /// Parses one body and extracts a record per listing block
    ///
    /// Kept synchronous so the document tree never lives across an await.
    fn process_page(&self, body: &str) -> PageOutcome {
        let page = match parse_page(body) {
            Ok(page) => page,
            Err(err) => {
                return PageOutcome {
                    parse_error: Some(err),
                    ..PageOutcome::default()
                }
            }
        };

        let fragments = page.listings(&self.selectors);
        if fragments.is_empty() {
            tracing::debug!(title = ?page.title(), "No listing blocks on page");
        }
        let records: Vec<HotelRecord> = fragments
            .iter()
            .map(|fragment| self.extractor.extract(fragment))
            .collect();

        PageOutcome {
            field_misses: records.iter().map(HotelRecord::missing_fields).sum(),
            fragment_count: fragments.len(),
            next_link: page.next_page(&self.selectors),
            records,
            parse_error: None,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|shutdown| *shutdown.borrow())
    }
}
