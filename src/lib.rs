//! # Iara - Gazette Watcher and Personal Assistant Backend
//!
//! This crate watches the municipal official gazette for new editions that
//! mention selected phrases and notifies a webhook when one does. It also
//! hosts the assistant's knowledge base: facts taught by the user are embedded
//! and stored, then retrieved to ground the assistant's answers.
//!
//! ## Features
//!
//! - Crawl cycle with a persisted dedup watermark, so each edition is announced at most once
//! - Case-insensitive keyword matching over the edition text
//! - Webhook notification with a JSON payload
//! - Cron-style schedule in the gazette's local timezone
//! - Retrieval-augmented answers backed by Gemini and ChromaDB
//!
//! ## Example
//!
//! ```rust,no_run
//! use iara::gazette::{Crawler, GazetteConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GazetteConfig::builder().state_path("/var/lib/iara/last_dom").build();
//!     let crawler = Crawler::from_config(config)?;
//!
//!     let outcome = crawler.run_cycle().await?;
//!     println!("{}", outcome);
//!     Ok(())
//! }
//! ```

mod error;

pub mod gazette;
pub mod rag;
pub mod scheduler;

pub use error::{Error, Result};

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::gazette::{CrawlOutcome, Crawler, GazetteConfig, PublicationId};
    pub use crate::rag::{RagConfig, RagService};
    pub use crate::scheduler::{CrawlScheduler, ScheduleConfig};
}
