use crate::config::types::{
    Config, FieldStrategy, OutputConfig, PaginationConfig, ScraperConfig, SelectorConfig,
};
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;

/// Upper bound on retries; beyond this a run mostly measures backoff
const MAX_RETRIES_LIMIT: u32 = 10;

/// Upper bound on the per-page delay, one hour
const MAX_DELAY_SECONDS: f64 = 3600.0;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)?;
    validate_pagination_config(&config.pagination)?;
    validate_selector_config(&config.selectors)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates pacing and retry configuration
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if !config.delay_seconds.is_finite() || config.delay_seconds < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay_seconds must be a non-negative number, got {}",
            config.delay_seconds
        )));
    }

    if config.delay_seconds > MAX_DELAY_SECONDS {
        return Err(ConfigError::Validation(format!(
            "delay_seconds must be <= {}, got {}",
            MAX_DELAY_SECONDS, config.delay_seconds
        )));
    }

    if config.timeout_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_seconds must be >= 1, got {}",
            config.timeout_seconds
        )));
    }

    if config.max_retries > MAX_RETRIES_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= {}, got {}",
            MAX_RETRIES_LIMIT, config.max_retries
        )));
    }

    if config.max_backoff_ms < config.backoff_base_ms {
        return Err(ConfigError::Validation(format!(
            "max_backoff_ms ({}) must be >= backoff_base_ms ({})",
            config.max_backoff_ms, config.backoff_base_ms
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when set".to_string(),
        ));
    }

    if config.max_run_seconds == Some(0) {
        return Err(ConfigError::Validation(
            "max_run_seconds must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates pagination configuration
fn validate_pagination_config(config: &PaginationConfig) -> Result<(), ConfigError> {
    if config.offset_param.trim().is_empty() {
        return Err(ConfigError::Validation(
            "offset_param cannot be empty".to_string(),
        ));
    }

    if config.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "page_size must be >= 1, got {}",
            config.page_size
        )));
    }

    Ok(())
}

/// Validates that every selector parses and every pattern compiles
fn validate_selector_config(config: &SelectorConfig) -> Result<(), ConfigError> {
    if config.listing.is_empty() {
        return Err(ConfigError::Validation(
            "at least one listing selector is required".to_string(),
        ));
    }

    for selector in config.listing.iter().chain(config.next_page.iter()) {
        validate_css(selector)?;
    }

    for strategy in config
        .name
        .iter()
        .chain(&config.location)
        .chain(&config.review_score)
        .chain(&config.review_count)
        .chain(&config.price)
    {
        validate_strategy(strategy)?;
    }

    Ok(())
}

fn validate_strategy(strategy: &FieldStrategy) -> Result<(), ConfigError> {
    match strategy {
        FieldStrategy::Css { selector } => validate_css(selector),
        FieldStrategy::Attr {
            selector,
            attribute,
        } => {
            if attribute.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "attribute name cannot be empty for selector '{}'",
                    selector
                )));
            }
            validate_css(selector)
        }
        FieldStrategy::Pattern { regex } => Regex::new(regex)
            .map(|_| ())
            .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", regex, e))),
    }
}

fn validate_css(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|_| ConfigError::InvalidSelector(selector.to_string()))
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
