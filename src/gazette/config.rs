//! # Gazette Watcher Configuration
//!
//! Everything the crawl cycle needs to know about the watched site: where the
//! index page lives, how to find the latest edition on it, which phrases make
//! an edition interesting, and where to report it.
//!
//! ## Key Components
//!
//! - `GazetteConfig`: the watcher parameters, defaulting to the Mossoró gazette
//! - `GazetteConfigBuilder`: builder for overriding individual values
//!
//! The defaults are the production values. Tests override the URLs to point at
//! a local mock server.

use std::path::PathBuf;
use std::time::Duration;

/// Index page of the official gazette
pub const DEFAULT_INDEX_URL: &str = "https://dom.mossoro.rn.gov.br/dom";

/// Endpoint notified when a matching edition shows up
pub const DEFAULT_WEBHOOK_URL: &str =
    "https://iara.digzom.dev/webhook/f97912c2-a20c-45c5-9642-4e51d33bd7d9/selection-process";

/// Bound applied to every outbound request
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration for the gazette watcher
#[derive(Debug, Clone)]
pub struct GazetteConfig {
    /// Index page listing the latest edition
    pub index_url: String,

    /// Webhook receiving `{url, rawDoc}` notifications
    pub webhook_url: String,

    /// Phrases searched for in a new edition, in priority order
    pub keywords: Vec<String>,

    /// CSS selector of the edition title elements
    pub title_selector: String,

    /// Literal text preceding the edition number in a title
    pub title_prefix: String,

    /// CSS selector of the container holding the edition links
    pub link_selector: String,

    /// File holding the last notified edition number
    pub state_path: PathBuf,

    /// Timeout in seconds for page fetches and webhook calls
    pub request_timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for GazetteConfig {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
            keywords: vec![
                "convocação".to_string(),
                "processo seletivo".to_string(),
                "processo seletivo simplificado".to_string(),
                "Edital nº 01/2025 da Secretaria Municipal de Educação".to_string(),
                "Secretaria Municipal de Educação".to_string(),
            ],
            title_selector: ".jom-title".to_string(),
            title_prefix: "DOM Nº ".to_string(),
            link_selector: "#ultima-edicao .last-jom-actions".to_string(),
            state_path: PathBuf::from("last_dom"),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: format!("iara-gazette/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Builder for GazetteConfig
#[derive(Debug, Default)]
pub struct GazetteConfigBuilder {
    config: GazetteConfig,
}

impl GazetteConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: GazetteConfig::default(),
        }
    }

    /// Set the index page URL
    pub fn index_url(mut self, index_url: impl Into<String>) -> Self {
        self.config.index_url = index_url.into();
        self
    }

    /// Set the webhook URL
    pub fn webhook_url(mut self, webhook_url: impl Into<String>) -> Self {
        self.config.webhook_url = webhook_url.into();
        self
    }

    /// Replace the target keywords
    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Set the title selector and the prefix stripped from its text
    pub fn title(mut self, selector: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.config.title_selector = selector.into();
        self.config.title_prefix = prefix.into();
        self
    }

    /// Set the selector of the edition link container
    pub fn link_selector(mut self, link_selector: impl Into<String>) -> Self {
        self.config.link_selector = link_selector.into();
        self
    }

    /// Set the state file path
    pub fn state_path(mut self, state_path: impl Into<PathBuf>) -> Self {
        self.config.state_path = state_path.into();
        self
    }

    /// Set the request timeout in seconds
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> GazetteConfig {
        self.config
    }
}

impl GazetteConfig {
    /// Create a new builder
    pub fn builder() -> GazetteConfigBuilder {
        GazetteConfigBuilder::new()
    }

    /// Get the request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
