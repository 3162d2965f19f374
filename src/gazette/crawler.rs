//! Crawl cycle orchestration

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::gazette::extraction::{inspect_index, page_text};
use crate::gazette::{
    CrawlError, CrawlOutcome, FileStore, GazetteConfig, HttpFetcher, KeywordSet, LastSeenStore,
    Notifier, PageFetcher, WebhookNotifier, WebhookPayload,
};

/// Runs crawl cycles against the gazette.
///
/// All collaborators are injected, so tests can swap in fakes. At most one
/// cycle runs at a time per crawler; a second caller is turned away with
/// [`CrawlError::CycleInProgress`] instead of racing on the watermark.
pub struct Crawler<F, N, S> {
    config: GazetteConfig,
    keywords: KeywordSet,
    fetcher: F,
    notifier: N,
    store: S,
    in_flight: Mutex<()>,
}

impl Crawler<HttpFetcher, WebhookNotifier, FileStore> {
    /// Production wiring: reqwest fetcher and notifier, file-backed watermark
    pub fn from_config(config: GazetteConfig) -> Result<Self, CrawlError> {
        let fetcher = HttpFetcher::new(config.request_timeout(), &config.user_agent)?;
        let notifier = WebhookNotifier::new(config.webhook_url.clone(), config.request_timeout())?;
        let store = FileStore::new(config.state_path.clone());
        Ok(Self::new(config, fetcher, notifier, store))
    }
}

impl<F, N, S> Crawler<F, N, S>
where
    F: PageFetcher,
    N: Notifier,
    S: LastSeenStore,
{
    pub fn new(config: GazetteConfig, fetcher: F, notifier: N, store: S) -> Self {
        let keywords = KeywordSet::new(config.keywords.iter().cloned());
        if keywords.is_empty() {
            warn!("No target keywords configured, no publication will ever be notified");
        }
        Self {
            config,
            keywords,
            fetcher,
            notifier,
            store,
            in_flight: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &GazetteConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether a cycle currently holds the guard
    pub fn is_running(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Wait until no cycle is in flight
    pub async fn wait_idle(&self) {
        let _guard = self.in_flight.lock().await;
    }

    /// Run one full crawl cycle.
    ///
    /// "No new publication" and "no keyword match" are successful outcomes.
    /// If the webhook goes out but the watermark cannot be written, the cycle
    /// fails with [`CrawlError::Persist`] and the next cycle notifies again.
    #[instrument(skip(self), fields(index = %self.config.index_url))]
    pub async fn run_cycle(&self) -> Result<CrawlOutcome, CrawlError> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| CrawlError::CycleInProgress)?;

        info!("Starting gazette crawl");
        let outcome = self.crawl().await;
        match &outcome {
            Ok(outcome) => info!(%outcome, "Gazette crawl finished"),
            Err(e) => warn!(error = %e, "Gazette crawl failed"),
        }
        outcome
    }

    async fn crawl(&self) -> Result<CrawlOutcome, CrawlError> {
        let html = self.fetcher.fetch(&self.config.index_url).await?;
        let index = inspect_index(
            &html,
            &self.config.title_selector,
            &self.config.title_prefix,
            &self.config.link_selector,
        )?;
        let latest = index.publication;

        let last_seen = self.store.read().await?;
        debug!(%latest, %last_seen, "Compared against watermark");

        if latest <= last_seen {
            return Ok(CrawlOutcome::NoNewPublication { latest, last_seen });
        }

        let link = index.link.as_deref().ok_or_else(|| {
            CrawlError::Extraction("could not find publication link".to_string())
        })?;
        let url = self.publication_url(link)?;
        info!(publication = %latest, %url, "Found publication link");

        let page = self.fetcher.fetch(&url).await?;
        let text = page_text(&page).to_lowercase();

        let Some(keyword) = self.keywords.find_in_normalized(&text) else {
            info!(publication = %latest, "No target keywords found in this publication");
            return Ok(CrawlOutcome::NoKeywordMatch {
                publication: latest,
                url,
            });
        };
        let keyword = keyword.to_string();
        info!(publication = %latest, %keyword, "Keyword found, sending webhook");

        // The payload carries the index page text, not the edition's.
        let payload = WebhookPayload {
            url: url.clone(),
            raw_doc: index.text,
        };
        self.notifier.send(&payload).await?;

        if let Err(e) = self.store.write(latest).await {
            warn!(
                publication = %latest,
                error = %e,
                "Webhook delivered but watermark not advanced; next cycle will notify again"
            );
            return Err(e);
        }

        Ok(CrawlOutcome::Notified {
            publication: latest,
            url,
            keyword,
        })
    }

    /// Resolve an edition link against the index page URL
    fn publication_url(&self, link: &str) -> Result<String, CrawlError> {
        let base = Url::parse(&self.config.index_url).map_err(|e| {
            CrawlError::Extraction(format!("invalid index URL {}: {}", self.config.index_url, e))
        })?;
        let url = base.join(link).map_err(|e| {
            CrawlError::Extraction(format!("invalid publication link {:?}: {}", link, e))
        })?;
        Ok(url.to_string())
    }
}
