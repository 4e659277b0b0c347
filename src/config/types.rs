use serde::{Deserialize, Serialize};

/// Main configuration structure for Hotel-Harvest
///
/// Every section has defaults, so an empty TOML file yields a working
/// configuration for the booking search-results markup.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Request pacing and retry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Pause after every successfully fetched page (seconds)
    #[serde(rename = "delay-seconds")]
    pub delay_seconds: f64,

    /// Upper bound for a single request (seconds)
    #[serde(rename = "timeout-seconds")]
    pub timeout_seconds: u64,

    /// Additional attempts after the first one for transient failures
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff (milliseconds)
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Cap applied to every backoff delay (milliseconds)
    #[serde(rename = "max-backoff-ms")]
    pub max_backoff_ms: u64,

    /// Stop after this many pages
    #[serde(rename = "max-pages")]
    pub max_pages: Option<u32>,

    /// Stop starting new pages once the run is older than this (seconds)
    #[serde(rename = "max-run-seconds")]
    pub max_run_seconds: Option<u64>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            delay_seconds: 1.0,
            timeout_seconds: 10,
            max_retries: 3,
            backoff_base_ms: 500,
            max_backoff_ms: 8_000,
            max_pages: None,
            max_run_seconds: None,
        }
    }
}

/// Request header configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    #[serde(rename = "accept-language")]
    pub accept_language: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
                .to_string(),
            accept_language: "en-US,en;q=0.5".to_string(),
        }
    }
}

/// How the next result page is addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaginationMode {
    /// Rewrite an offset query parameter on the start URL
    Offset,
    /// Follow the href of the next-page affordance
    Link,
}

/// Pagination configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub mode: PaginationMode,

    /// Query parameter holding the result offset
    #[serde(rename = "offset-param")]
    pub offset_param: String,

    /// Number of listings the site shows per page
    #[serde(rename = "page-size")]
    pub page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            mode: PaginationMode::Offset,
            offset_param: "offset".to_string(),
            page_size: 25,
        }
    }
}

/// One way of pulling a field value out of a listing block
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FieldStrategy {
    /// Text content of the first element matching `selector`
    Css { selector: String },

    /// Attribute value of the first element matching `selector`
    Attr { selector: String, attribute: String },

    /// First capture group (or whole match) of `regex` over the block's text
    Pattern { regex: String },
}

impl FieldStrategy {
    pub fn css(selector: &str) -> Self {
        Self::Css {
            selector: selector.to_string(),
        }
    }

    pub fn attr(selector: &str, attribute: &str) -> Self {
        Self::Attr {
            selector: selector.to_string(),
            attribute: attribute.to_string(),
        }
    }

    pub fn pattern(regex: &str) -> Self {
        Self::Pattern {
            regex: regex.to_string(),
        }
    }
}

/// Markup selectors, tried in order until one yields a value
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Selectors for the repeating listing block, primary first
    pub listing: Vec<String>,

    /// Selectors for the "next page" affordance
    #[serde(rename = "next-page")]
    pub next_page: Vec<String>,

    pub name: Vec<FieldStrategy>,

    pub location: Vec<FieldStrategy>,

    #[serde(rename = "review-score")]
    pub review_score: Vec<FieldStrategy>,

    #[serde(rename = "review-count")]
    pub review_count: Vec<FieldStrategy>,

    pub price: Vec<FieldStrategy>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            listing: vec![
                r#"div[data-testid="property-card"]"#.to_string(),
                r#"div[role="listitem"]"#.to_string(),
            ],
            next_page: vec![
                r#"button[aria-label="Next page"]"#.to_string(),
                r#"a[rel="next"]"#.to_string(),
            ],
            name: vec![
                FieldStrategy::css(r#"div[data-testid="title"]"#),
                FieldStrategy::css("div.b87c397a13.a3e0b4ffd1"),
            ],
            location: vec![
                FieldStrategy::css(r#"span[data-testid="address"]"#),
                FieldStrategy::css("div.d823fbbeed.f9b3563dd4"),
            ],
            review_score: vec![
                FieldStrategy::css(r#"div[data-testid="review-score"] div[aria-hidden="true"]"#),
                FieldStrategy::css("div.f63b14ab7a.f546354b44.becbee2f63"),
                FieldStrategy::pattern(r"(?i)scored\s+(\d+(?:[.,]\d+)?)"),
            ],
            review_count: vec![
                FieldStrategy::css("div.fff1944c52.fb14de7f14.eaa8455879"),
                FieldStrategy::pattern(r"(?i)(\d+(?:[.,\s]\d{3})*)\s+reviews?\b"),
            ],
            price: vec![
                FieldStrategy::css(r#"span[data-testid="price-and-discounted-price"]"#),
                FieldStrategy::css("span.b87c397a13.f2f358d1de.ab607752a2"),
            ],
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Destination file, replaced on every run
    pub path: String,

    pub format: crate::output::OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "booking_hotels.csv".to_string(),
            format: crate::output::OutputFormat::Csv,
        }
    }
}
