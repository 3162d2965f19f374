//! Error types for the Iara crate

use thiserror::Error;

/// Result type for Iara operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Iara operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Gazette crawl error
    #[error("Crawl error: {0}")]
    Crawl(String),

    /// Scheduler error
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// Retrieval-augmented generation error
    #[error("RAG error: {0}")]
    Rag(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
