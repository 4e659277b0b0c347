//! Pagination across search-result pages
//!
//! The paginator is a pure function of [`PageRequestState`] and what the
//! current page showed. It keeps no counters of its own, so asking twice
//! with the same inputs gives the same answer.

use crate::config::{PaginationConfig, PaginationMode};
use crate::pipeline::parser::NextPageLink;
use url::Url;

/// Where the run currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequestState {
    /// URL of the page just fetched
    pub url: Url,

    /// 1-based index of the page just fetched
    pub page_index: u32,

    /// Records accumulated so far, this page included
    pub records_so_far: usize,
}

impl PageRequestState {
    /// State for the first page of a run
    pub fn first(url: Url) -> Self {
        Self {
            url,
            page_index: 1,
            records_so_far: 0,
        }
    }
}

/// The request for the following page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextRequest {
    pub url: Url,
    pub page_index: u32,
}

/// Why pagination ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    /// The page just fetched had no listings
    EmptyPage,
    /// The configured page limit was reached
    MaxPages,
    /// The page has no usable next-page affordance
    NoNextPage,
}

/// Decision after each page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStep {
    Next(NextRequest),
    Done(DoneReason),
}

/// Derives follow-up requests from the current page
#[derive(Debug, Clone)]
pub struct Paginator {
    mode: PaginationMode,
    offset_param: String,
    page_size: u32,
    max_pages: Option<u32>,
}

impl Paginator {
    pub fn new(config: &PaginationConfig, max_pages: Option<u32>) -> Self {
        Self {
            mode: config.mode,
            offset_param: config.offset_param.clone(),
            page_size: config.page_size,
            max_pages,
        }
    }

    /// Decides whether and how to continue
    ///
    /// Stopping policy, in priority order:
    /// 1. the page had zero listings
    /// 2. the page limit is reached
    /// 3. the page shows no next-page affordance (or, when following links,
    ///    one without an href that resolves)
    ///
    /// Otherwise the next page's URL is derived from the state: in offset
    /// mode the current offset parameter is incremented by `page_size`. A
    /// next URL equal to the current one (fragment aside) also ends the run.
    pub fn next(
        &self,
        state: &PageRequestState,
        fragment_count: usize,
        next_link: Option<&NextPageLink>,
    ) -> PageStep {
        if fragment_count == 0 {
            return PageStep::Done(DoneReason::EmptyPage);
        }

        if self
            .max_pages
            .is_some_and(|max_pages| state.page_index >= max_pages)
        {
            return PageStep::Done(DoneReason::MaxPages);
        }

        let Some(link) = next_link else {
            return PageStep::Done(DoneReason::NoNextPage);
        };

        let url = match self.mode {
            PaginationMode::Offset => self.offset_url(&state.url),
            PaginationMode::Link => match link.href.as_deref().map(|href| state.url.join(href)) {
                Some(Ok(mut url)) if url.scheme() == "http" || url.scheme() == "https" => {
                    url.set_fragment(None);
                    url
                }
                _ => return PageStep::Done(DoneReason::NoNextPage),
            },
        };

        // An affordance pointing back at the current page (`href="#"`) would
        // refetch it forever.
        if without_fragment(&url) == without_fragment(&state.url) {
            return PageStep::Done(DoneReason::NoNextPage);
        }

        PageStep::Next(NextRequest {
            url,
            page_index: state.page_index + 1,
        })
    }

    /// Returns `url` with the offset parameter advanced by one page,
    /// keeping every other query pair in order
    ///
    /// A missing or non-numeric offset counts as 0, so a start URL already
    /// deep in the results continues forward from there.
    fn offset_url(&self, url: &Url) -> Url {
        let current = url
            .query_pairs()
            .find(|(key, _)| key == self.offset_param.as_str())
            .and_then(|(_, value)| value.trim().parse::<u64>().ok())
            .unwrap_or(0);
        let offset = current.saturating_add(u64::from(self.page_size));

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != self.offset_param.as_str())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        let mut next = url.clone();
        next.query_pairs_mut()
            .clear()
            .extend_pairs(pairs)
            .append_pair(&self.offset_param, &offset.to_string());
        next
    }
}

fn without_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}
