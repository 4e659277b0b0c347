//! HTML parser for locating listing blocks
//!
//! This module turns a response body into a document tree and finds:
//! - The repeating listing blocks, one per hotel
//! - The "next page" affordance, if the page has one
//!
//! Tree building is tolerant: malformed markup produces a best-effort tree.
//! Only bodies that are not markup at all are rejected.

use crate::config::SelectorConfig;
use crate::{ConfigError, ParseError};
use scraper::{ElementRef, Html, Selector};

/// Listing and next-page selectors, compiled once per run
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    listing: Vec<(String, Selector)>,
    next_page: Vec<Selector>,
}

impl ListingSelectors {
    /// Compiles the configured selector lists
    ///
    /// # Returns
    ///
    /// * `Ok(ListingSelectors)` - All selectors parsed
    /// * `Err(ConfigError::InvalidSelector)` - The first selector that did not parse
    pub fn compile(config: &SelectorConfig) -> Result<Self, ConfigError> {
        let listing = config
            .listing
            .iter()
            .map(|s| compile_selector(s).map(|sel| (s.clone(), sel)))
            .collect::<Result<Vec<_>, _>>()?;

        let next_page = config
            .next_page
            .iter()
            .map(|s| compile_selector(s))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { listing, next_page })
    }
}

pub(crate) fn compile_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector(selector.to_string()))
}

/// The "next page" control found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextPageLink {
    /// Raw href, if the control is a link
    pub href: Option<String>,
}

/// A parsed search-results page
pub struct ParsedPage {
    document: Html,
}

impl ParsedPage {
    /// Returns the listing blocks in document order
    ///
    /// Listing selectors are tried in order; the first one that matches at
    /// least one element wins. An empty vector means no selector matched.
    pub fn listings<'a>(&'a self, selectors: &ListingSelectors) -> Vec<ElementRef<'a>> {
        for (index, (source, selector)) in selectors.listing.iter().enumerate() {
            let found: Vec<ElementRef<'a>> = self.document.select(selector).collect();
            if !found.is_empty() {
                if index > 0 {
                    tracing::debug!(
                        selector = source.as_str(),
                        "Primary listing selector matched nothing, used fallback #{}",
                        index
                    );
                }
                return found;
            }
        }

        Vec::new()
    }

    /// Returns the enabled "next page" control, if any
    ///
    /// Controls carrying `disabled` or `aria-disabled="true"` are ignored.
    pub fn next_page(&self, selectors: &ListingSelectors) -> Option<NextPageLink> {
        selectors
            .next_page
            .iter()
            .flat_map(|selector| self.document.select(selector))
            .find(|element| !is_disabled(element))
            .map(|element| NextPageLink {
                href: element
                    .value()
                    .attr("href")
                    .map(str::trim)
                    .filter(|href| !href.is_empty())
                    .map(str::to_string),
            })
    }

    /// Returns the page title, if present
    pub fn title(&self) -> Option<String> {
        let title_selector = Selector::parse("title").ok()?;

        self.document
            .select(&title_selector)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

fn is_disabled(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    value.attr("disabled").is_some()
        || value
            .attr("aria-disabled")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Parses a response body into a document tree
///
/// # Errors
///
/// Returns [`ParseError::Unparseable`] when the body is empty, looks like a
/// JSON document, or contains no markup tags at all.
///
/// # Example
///
/// ```
/// use hotel_harvest::pipeline::parse_page;
///
/// let page = parse_page("<html><head><title>Paris</title></head></html>").unwrap();
/// assert_eq!(page.title(), Some("Paris".to_string()));
/// assert!(parse_page(r#"{"error": "blocked"}"#).is_err());
/// ```
pub fn parse_page(markup: &str) -> Result<ParsedPage, ParseError> {
    let trimmed = markup.trim_start_matches('\u{feff}').trim();

    if trimmed.is_empty() {
        return Err(ParseError::Unparseable("empty body".to_string()));
    }

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Err(ParseError::Unparseable("body is a JSON document".to_string()));
    }

    if !contains_tag(trimmed) {
        return Err(ParseError::Unparseable("no markup tags found".to_string()));
    }

    Ok(ParsedPage {
        document: Html::parse_document(markup),
    })
}

/// True if `text` has a `<` followed by a tag name, `/` or `!`
fn contains_tag(text: &str) -> bool {
    text.as_bytes()
        .windows(2)
        .any(|w| w[0] == b'<' && (w[1].is_ascii_alphabetic() || w[1] == b'/' || w[1] == b'!'))
}
