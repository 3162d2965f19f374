//! # Crawl Scheduler
//!
//! Fires gazette crawl cycles on a cron schedule in a named timezone, and
//! exposes the manual trigger used by administrative callers.
//!
//! ```text
//! JobScheduler (0 0 8-23/2 * * *, America/Sao_Paulo)
//!     │
//!     └─► Crawler::run_cycle()  ◄── trigger() (manual, synchronous)
//! ```
//!
//! Both paths share the crawler's single-flight guard, so a scheduled firing
//! that lands while a manual cycle runs is skipped rather than duplicated.

use std::sync::Arc;

use chrono_tz::Tz;
use thiserror::Error;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{info, instrument, warn};

use crate::error::Error as CrateError;
use crate::gazette::{CrawlError, CrawlOutcome, Crawler, LastSeenStore, Notifier, PageFetcher};

/// Every two hours from 08:00 through 22:00 (seconds field first)
pub const DEFAULT_CRON: &str = "0 0 8-23/2 * * *";

/// Timezone the schedule is evaluated in
pub const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";

/// Error type for scheduler operations
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The underlying job scheduler rejected an operation
    #[error("Job scheduler error: {0}")]
    Job(#[from] JobSchedulerError),

    /// `start` called on a running scheduler
    #[error("Scheduler already started")]
    AlreadyStarted,
}

impl From<SchedulerError> for CrateError {
    fn from(err: SchedulerError) -> Self {
        CrateError::Scheduler(err.to_string())
    }
}

/// When crawl cycles fire
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Six-field cron expression
    pub cron: String,

    /// IANA timezone name; unknown names fall back to UTC
    pub timezone: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: DEFAULT_CRON.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

/// Look up a timezone by name, falling back to UTC
pub fn resolve_timezone(name: &str) -> Tz {
    match name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(e) => {
            warn!(timezone = name, error = %e, "Could not load timezone, using UTC");
            Tz::UTC
        }
    }
}

/// Drives a [`Crawler`] on a recurring schedule
pub struct CrawlScheduler<F, N, S> {
    crawler: Arc<Crawler<F, N, S>>,
    config: ScheduleConfig,
    timezone: Tz,
    runner: Option<JobScheduler>,
}

impl<F, N, S> CrawlScheduler<F, N, S>
where
    F: PageFetcher + 'static,
    N: Notifier + 'static,
    S: LastSeenStore + 'static,
{
    pub fn new(crawler: Arc<Crawler<F, N, S>>, config: ScheduleConfig) -> Self {
        let timezone = resolve_timezone(&config.timezone);
        Self {
            crawler,
            config,
            timezone,
            runner: None,
        }
    }

    pub fn crawler(&self) -> &Arc<Crawler<F, N, S>> {
        &self.crawler
    }

    /// Timezone actually in use after fallback
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn is_started(&self) -> bool {
        self.runner.is_some()
    }

    /// Register the crawl job and start the background runner.
    ///
    /// Returns as soon as the runner is spawned.
    #[instrument(skip(self), fields(cron = %self.config.cron, timezone = %self.timezone))]
    pub async fn start(&mut self) -> Result<(), SchedulerError> {
        if self.runner.is_some() {
            return Err(SchedulerError::AlreadyStarted);
        }

        let runner = JobScheduler::new().await?;
        runner.add(self.crawl_job()?).await?;
        runner.start().await?;
        self.runner = Some(runner);

        info!("Gazette crawler schedule started");
        Ok(())
    }

    fn crawl_job(&self) -> Result<Job, SchedulerError> {
        let crawler = self.crawler.clone();
        let job = Job::new_async_tz(
            self.config.cron.as_str(),
            self.timezone,
            move |_uuid, _scheduler| {
                let crawler = crawler.clone();
                Box::pin(async move {
                    info!("Scheduled gazette crawl triggered");
                    // other failures are logged by the crawler itself
                    if let Err(CrawlError::CycleInProgress) = crawler.run_cycle().await {
                        warn!("Previous crawl still running, skipping this firing");
                    }
                })
            },
        )?;
        Ok(job)
    }

    /// Stop scheduling new cycles.
    ///
    /// A cycle already in flight runs to completion before this returns.
    /// Safe to call more than once.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), SchedulerError> {
        if let Some(mut runner) = self.runner.take() {
            info!("Stopping gazette crawler schedule");
            runner.shutdown().await?;
        }
        self.crawler.wait_idle().await;
        Ok(())
    }

    /// Run exactly one crawl cycle now, independent of the schedule
    pub async fn trigger(&self) -> Result<CrawlOutcome, CrawlError> {
        info!("Manual gazette crawl trigger");
        self.crawler.run_cycle().await
    }
}
