//! # Gazette Watcher
//!
//! Watches the municipal official gazette ("Diário Oficial do Município") and
//! fires a webhook when a new edition mentions one of the target phrases.
//!
//! ## Key Components
//!
//! - `Crawler`: runs one crawl cycle (fetch, compare, match, notify, persist)
//! - `PageFetcher` / `HttpFetcher`: bounded-timeout HTTP GET
//! - `KeywordSet`: case-insensitive phrase matching
//! - `LastSeenStore` / `FileStore` / `MemoryStore`: the dedup watermark
//! - `Notifier` / `WebhookNotifier`: JSON webhook delivery
//!
//! ## Cycle
//!
//! ```text
//! index page ─► edition number ─► newer than watermark? ── no ─► NoNewPublication
//!                                        │ yes
//!                                        ▼
//!                               edition page text ─► keyword? ── no ─► NoKeywordMatch
//!                                                        │ yes
//!                                                        ▼
//!                                                 webhook ─► watermark = edition
//! ```
//!
//! The watermark only moves after the webhook accepted the notification.

mod config;
mod crawler;
mod error;
pub mod extraction;
mod fetcher;
mod keywords;
mod notifier;
mod store;

pub use config::{GazetteConfig, GazetteConfigBuilder};
pub use crawler::Crawler;
pub use error::CrawlError;
pub use fetcher::{HttpFetcher, PageFetcher};
pub use keywords::KeywordSet;
pub use notifier::{Notifier, WebhookNotifier, WebhookPayload};
pub use store::{FileStore, LastSeenStore, MemoryStore};

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Edition number scraped from the gazette title, e.g. `DOM Nº 1234`.
///
/// Compared numerically, never as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct PublicationId(u64);

impl PublicationId {
    /// Watermark value meaning "nothing notified yet"
    pub const ZERO: Self = Self(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for PublicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PublicationId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Successful end state of a crawl cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CrawlOutcome {
    /// Latest edition is not newer than the watermark
    NoNewPublication {
        latest: PublicationId,
        last_seen: PublicationId,
    },

    /// New edition without any target phrase; watermark left alone
    NoKeywordMatch {
        publication: PublicationId,
        url: String,
    },

    /// Webhook delivered and watermark advanced
    Notified {
        publication: PublicationId,
        url: String,
        keyword: String,
    },
}

impl CrawlOutcome {
    /// Whether a webhook went out during the cycle
    pub fn notified(&self) -> bool {
        matches!(self, CrawlOutcome::Notified { .. })
    }
}

impl fmt::Display for CrawlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlOutcome::NoNewPublication { latest, last_seen } => write!(
                f,
                "no new publication (latest {}, last notified {})",
                latest, last_seen
            ),
            CrawlOutcome::NoKeywordMatch { publication, url } => {
                write!(f, "publication {} at {} has no target keywords", publication, url)
            }
            CrawlOutcome::Notified {
                publication,
                url,
                keyword,
            } => write!(
                f,
                "publication {} at {} matched {:?}, webhook sent",
                publication, url, keyword
            ),
        }
    }
}
