//! Page fetching

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use crate::gazette::error::CrawlError;

/// Fetches raw HTML for a URL
pub trait PageFetcher: Send + Sync {
    /// GET `url`, returning the body of a 2xx response
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, CrawlError>> + Send;
}

/// [`PageFetcher`] over a reqwest client with a bounded timeout
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout`
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| CrawlError::fetch("", format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, url: &str) -> Result<String, CrawlError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CrawlError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::fetch(url, format!("returned status {}", status)));
        }

        let body = response.text().await.map_err(|e| CrawlError::fetch(url, e))?;
        debug!(bytes = body.len(), "Fetched page");
        Ok(body)
    }
}
