//! Drives scrape cycles on a fixed schedule and hands each batch to an exporter.

use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::metrics::Metrics;
use crate::scraper::DomainScraper;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(15 * 60);
const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Destination for the batch produced by each cycle.
pub trait MetricsExporter {
    fn export(&mut self, metrics: &Metrics) -> Result<()>;
}

#[derive(Debug)]
pub struct ScrapeController {
    scraper: DomainScraper,
    interval: Duration,
    initial_delay: Duration,
    timeout: Option<Duration>,
}

impl ScrapeController {
    /// Wraps an already started scraper with the default schedule.
    pub fn new(scraper: DomainScraper) -> Self {
        Self {
            scraper,
            interval: DEFAULT_INTERVAL,
            initial_delay: DEFAULT_INITIAL_DELAY,
            timeout: None,
        }
    }

    /// Builds and starts a scraper for `config` and takes its schedule from it.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut scraper = DomainScraper::new(config);
        scraper.start()?;

        Ok(Self::new(scraper)
            .with_interval(config.collection_interval())
            .with_initial_delay(config.initial_delay())
            .with_timeout(config.timeout()))
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn scraper(&self) -> &DomainScraper {
        &self.scraper
    }

    /// Runs a single cycle under a child of `shutdown`.
    ///
    /// When the deadline passes the child token is cancelled and the cycle
    /// still returns whatever it recorded before that.
    pub async fn run_cycle(&self, shutdown: &CancellationToken) -> Result<Metrics> {
        let cycle_token = shutdown.child_token();
        let cycle = self.scraper.scrape(cycle_token.clone());
        tokio::pin!(cycle);

        let Some(timeout) = self.timeout else {
            return cycle.await;
        };

        tokio::select! {
            result = &mut cycle => result,
            _ = tokio::time::sleep(timeout) => {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Scrape cycle deadline reached, cancelling outstanding lookups"
                );
                cycle_token.cancel();
                cycle.await
            }
        }
    }

    /// Runs cycles until `shutdown` is cancelled.
    ///
    /// The batch of a cycle interrupted by shutdown is still exported before
    /// returning. Export failures are logged and the schedule carries on.
    pub async fn run<E>(&self, exporter: &mut E, shutdown: CancellationToken) -> Result<()>
    where
        E: MetricsExporter + ?Sized,
    {
        info!(
            domains = self.scraper.targets().len(),
            interval_secs = self.interval.as_secs(),
            initial_delay_ms = self.initial_delay.as_millis() as u64,
            "Starting domain expiry collection"
        );

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!("Shutdown requested before first cycle");
                return Ok(());
            }
            _ = tokio::time::sleep(self.initial_delay) => {}
        }

        let mut ticker = interval_at(Instant::now(), self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let metrics = self.run_cycle(&shutdown).await?;

            match exporter.export(&metrics) {
                Ok(()) => debug!(records = metrics.len(), "Exported metrics"),
                Err(e) => error!(error = %e, records = metrics.len(), "Failed to export metrics"),
            }

            if shutdown.is_cancelled() {
                break;
            }
        }

        info!("Domain expiry collection stopped");
        Ok(())
    }
}
