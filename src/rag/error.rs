//! Error types for the RAG module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Errors that can occur while learning facts or answering messages
#[derive(Debug, Error)]
pub enum RagError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Remote API answered with an unexpected status
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Response body
        message: String,
    },

    /// Generation returned no candidates or no text
    #[error("No content generated")]
    EmptyResponse,

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector store operation failed
    #[error("Vector store error: {0}")]
    Store(String),

    /// Text generation failed
    #[error("Generation error: {0}")]
    Generation(String),

    /// Vector store never became reachable
    #[error("Could not connect to {url} after {attempts} attempts")]
    Unavailable {
        /// Base URL of the store
        url: String,
        /// Number of heartbeats tried
        attempts: u32,
    },
}

impl From<RagError> for CrateError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::Http(e) => CrateError::Http(e),
            RagError::Json(e) => CrateError::Json(e),
            _ => CrateError::Rag(err.to_string()),
        }
    }
}
