//! Hotel-Harvest: a polite hotel listing extractor
//!
//! This crate fetches hotel search-results pages, isolates the repeating
//! listing blocks, maps each one into a [`HotelRecord`], walks the result
//! pages and writes the accumulated records to a tabular file.

pub mod config;
pub mod output;
pub mod pipeline;

use std::fmt;
use thiserror::Error;

/// Main error type for Hotel-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid text pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid HTTP header value: {0}")]
    InvalidHeader(String),
}

/// Classification of a fetch failure
///
/// Timeouts, refused connections, interrupted transfers and 5xx statuses are
/// transient and retried inside the fetcher. Everything else is permanent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The request did not complete within the configured timeout
    Timeout,

    /// The connection could not be established
    ConnectionRefused,

    /// The server answered with a non-2xx status
    HttpStatus(u16),

    /// The redirect chain exceeded the client's limit
    TooManyRedirects,

    /// The transfer broke off after the connection was established
    Interrupted,
}

impl FetchErrorKind {
    /// Returns true if a retry may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionRefused | Self::Interrupted => true,
            Self::HttpStatus(code) => (500..600).contains(code),
            Self::TooManyRedirects => false,
        }
    }

    /// Short stable label used in structured log fields
    pub fn label(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionRefused => "connection_refused",
            Self::HttpStatus(_) => "http_status",
            Self::TooManyRedirects => "too_many_redirects",
            Self::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timeout"),
            Self::ConnectionRefused => write!(f, "connection refused"),
            Self::HttpStatus(code) => write!(f, "HTTP {}", code),
            Self::TooManyRedirects => write!(f, "too many redirects"),
            Self::Interrupted => write!(f, "transfer interrupted"),
        }
    }
}

/// A fetch that failed after the retry policy was exhausted
#[derive(Debug, Clone, Error)]
#[error("Fetch failed for {url}: {kind} (after {attempts} attempt(s))")]
pub struct FetchError {
    pub url: String,
    pub kind: FetchErrorKind,
    pub attempts: u32,
}

/// Markup that could not be turned into a document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Response body is not HTML markup: {0}")]
    Unparseable(String),
}

/// Result type alias for Hotel-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use output::{write_records, OutputFormat};
pub use pipeline::{HotelRecord, Pipeline, RunResult, StopReason};
