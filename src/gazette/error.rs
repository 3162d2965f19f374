//! Error types for the gazette crawler

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for a single crawl cycle.
///
/// Every variant is cycle-local: it aborts the current cycle only and never
/// takes the scheduler down with it.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Page unreachable, timed out or answered outside 2xx
    #[error("Fetch error for {url}: {message}")]
    Fetch {
        /// URL that was requested
        url: String,
        /// What went wrong
        message: String,
    },

    /// Expected HTML structure absent or identifier malformed
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Last-seen state could not be read or written
    #[error("Persist error: {0}")]
    Persist(String),

    /// Webhook unreachable or answered outside 2xx
    #[error("Notify error: {0}")]
    Notify(String),

    /// Another cycle holds the single-flight guard
    #[error("A crawl cycle is already in progress")]
    CycleInProgress,
}

impl CrawlError {
    pub(crate) fn fetch(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }
}

impl From<CrawlError> for CrateError {
    fn from(err: CrawlError) -> Self {
        CrateError::Crawl(err.to_string())
    }
}
