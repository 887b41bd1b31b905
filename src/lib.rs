use std::time::Duration;
use thiserror::Error;

pub mod acquisition;
pub mod chunker;
pub mod config;
pub mod pipeline;
pub mod scraper;
pub mod session;
pub mod sources;
pub mod summarize;
pub mod types;

// Re-export commonly used types
pub use config::DigestConfig;
pub use pipeline::Pipeline;
pub use types::{AcquisitionResult, Chunk, PipelineResult, SiteId, SiteSummary, SourceItem};

/// The `DigestError` enum represents the failures that can occur while acquiring and summarizing content.
#[derive(Error, Debug)]
pub enum DigestError {
    /// Represents an error that occurs during an HTTP request.
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    /// The requested site has no registered driver.
    #[error("Unsupported site: {0}")]
    UnsupportedSite(String),
    /// An automation session could not be acquired or released.
    #[error("Session failure: {0}")]
    SessionError(String),
    /// Navigating to a location failed for a reason other than a timeout of the whole task.
    #[error("Navigation failed: {0}")]
    NavigationError(String),
    /// Represents an error that occurs during content extraction.
    #[error("Content extraction failed: {0}")]
    ExtractionError(String),
    /// The summarization capability failed.
    #[error("Summarization failed: {0}")]
    SummarizationError(String),
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ::config::ConfigError),
    /// The request itself is malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// A type alias for `Result` with the `DigestError` error type.
pub type Result<T> = std::result::Result<T, DigestError>;

// Constants

/// The default timeout for a single navigation.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
/// The default upper bound for one site's whole acquisition task.
pub const DEFAULT_SITE_TIMEOUT: Duration = Duration::from_secs(120);
/// The default cap on concurrently processed sites.
pub const DEFAULT_SITE_WORKERS: usize = 8;
/// The default cap on concurrently summarized chunks of one text.
pub const DEFAULT_CHUNK_WORKERS: usize = 6;

/// Error recorded for a site that has no registered driver.
pub const UNSUPPORTED_SITE: &str = "Unsupported site";
/// Error recorded for a site whose acquisition produced no text.
pub const NO_CONTENT_SCRAPED: &str = "No valid content scraped";
