//! Waymirror: offline site reconstruction from Wayback Machine captures
//!
//! This crate rebuilds a browsable local mirror of a historical website from
//! the snapshots a public web archive recorded for it. It discovers every
//! capture of pages under a domain, downloads page content and linked assets,
//! rewrites in-page references to the locally saved copies, and emits an
//! index page listing every URL with all of its captured versions.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod governor;
pub mod index;
pub mod mirror;
pub mod model;
pub mod queue;

use thiserror::Error;

/// Main error type for waymirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Date error: {0}")]
    Date(#[from] DateError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Cache error: {0}")]
    Cache(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Insufficient disk space: {available_gb:.1}GB available, {required_gb:.1}GB required")]
    InsufficientDisk { available_gb: f64, required_gb: f64 },

    #[error("No captures found for domain {0}")]
    NoCaptures(String),
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

    #[error("Invalid date: {0}")]
    Date(#[from] DateError),
}

/// Date-input normalization errors
#[derive(Debug, Error)]
pub enum DateError {
    #[error("Unrecognized date format: {0}")]
    Unrecognized(String),

    #[error("Invalid calendar date: {0}")]
    OutOfRange(String),

    #[error("Start date {start} is after end date {end}")]
    InvertedRange { start: String, end: String },
}

/// Result type alias for waymirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{Capture, ResourceKind, ResourceRef};
