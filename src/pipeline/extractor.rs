//! Record extraction from listing blocks
//!
//! Each field has an ordered list of strategies. The first strategy that
//! yields a non-empty value (and, for numeric fields, a value that parses)
//! wins. When every strategy misses, the field is `None` and the miss is
//! counted; extraction itself never fails.

use crate::config::{FieldStrategy, SelectorConfig};
use crate::pipeline::numbers::{parse_decimal, parse_integer};
use crate::pipeline::parser::compile_selector;
use crate::pipeline::types::HotelRecord;
use crate::ConfigError;
use regex::Regex;
use scraper::{ElementRef, Selector};

const MAX_REVIEW_SCORE: f64 = 10.0;

/// A field strategy with its selector or pattern compiled
#[derive(Debug, Clone)]
enum CompiledStrategy {
    Css(Selector),
    Attr(Selector, String),
    Pattern(Regex),
}

impl CompiledStrategy {
    fn compile(strategy: &FieldStrategy) -> Result<Self, ConfigError> {
        Ok(match strategy {
            FieldStrategy::Css { selector } => Self::Css(compile_selector(selector)?),
            FieldStrategy::Attr {
                selector,
                attribute,
            } => Self::Attr(compile_selector(selector)?, attribute.clone()),
            FieldStrategy::Pattern { regex } => Self::Pattern(
                Regex::new(regex)
                    .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", regex, e)))?,
            ),
        })
    }

    /// Returns the raw text this strategy finds in `fragment`
    fn apply(&self, fragment: &ElementRef<'_>) -> Option<String> {
        let raw = match self {
            Self::Css(selector) => fragment
                .select(selector)
                .next()
                .map(|element| block_text(&element))?,
            Self::Attr(selector, attribute) => fragment
                .select(selector)
                .find_map(|element| element.value().attr(attribute))
                .map(collapse_whitespace)?,
            Self::Pattern(regex) => {
                let text = block_text(fragment);
                let captures = regex.captures(&text)?;
                let matched = captures.get(1).or_else(|| captures.get(0))?;
                matched.as_str().trim().to_string()
            }
        };

        Some(raw).filter(|value| !value.is_empty())
    }
}

/// Ordered strategies for one field
#[derive(Debug, Clone)]
struct FieldRule {
    field: &'static str,
    strategies: Vec<CompiledStrategy>,
}

impl FieldRule {
    fn compile(field: &'static str, strategies: &[FieldStrategy]) -> Result<Self, ConfigError> {
        Ok(Self {
            field,
            strategies: strategies
                .iter()
                .map(CompiledStrategy::compile)
                .collect::<Result<_, _>>()?,
        })
    }

    /// First value that is non-empty and accepted by `coerce`
    fn extract<T>(
        &self,
        fragment: &ElementRef<'_>,
        coerce: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        let value = self
            .strategies
            .iter()
            .filter_map(|strategy| strategy.apply(fragment))
            .find_map(|raw| coerce(&raw));

        if value.is_none() {
            tracing::debug!(field = self.field, "No strategy produced a value");
        }
        value
    }
}

/// Compiled extraction rules for every record field
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    name: FieldRule,
    location: FieldRule,
    review_score: FieldRule,
    review_count: FieldRule,
    price: FieldRule,
}

impl RecordExtractor {
    /// Compiles the per-field strategy lists
    pub fn compile(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            name: FieldRule::compile("name", &config.name)?,
            location: FieldRule::compile("location", &config.location)?,
            review_score: FieldRule::compile("review_score", &config.review_score)?,
            review_count: FieldRule::compile("review_count", &config.review_count)?,
            price: FieldRule::compile("price", &config.price)?,
        })
    }

    /// Extracts one record from a listing block
    ///
    /// Always returns a record; fields that no strategy could fill are `None`.
    /// A review score outside 0.0 to 10.0 is treated as a miss.
    pub fn extract(&self, fragment: &ElementRef<'_>) -> HotelRecord {
        HotelRecord {
            name: self.name.extract(fragment, text_value),
            location: self.location.extract(fragment, text_value),
            review_score: self.review_score.extract(fragment, |raw| {
                parse_decimal(raw).filter(|score| (0.0..=MAX_REVIEW_SCORE).contains(score))
            }),
            review_count: self.review_count.extract(fragment, parse_integer),
            price: self.price.extract(fragment, text_value),
        }
    }
}

fn text_value(raw: &str) -> Option<String> {
    Some(raw.to_string())
}

/// Text content of an element with a space between adjacent text nodes
///
/// Minified markup puts sibling elements back to back, so `<b>9.1</b><i>87
/// reviews</i>` must not read as `9.187 reviews`.
fn block_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Joins text nodes the way a browser renders them: runs of whitespace
/// (including non-breaking spaces) become a single space
fn collapse_whitespace(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
