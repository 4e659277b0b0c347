//! Configuration module for Hotel-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! All keys are optional; defaults target the booking search-results markup.
//!
//! # Example
//!
//! ```no_run
//! use hotel_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Listing selectors: {:?}", config.selectors.listing);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, FieldStrategy, HttpConfig, OutputConfig, PaginationConfig, PaginationMode,
    ScraperConfig, SelectorConfig,
};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
