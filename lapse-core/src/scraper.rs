//! The per-cycle scrape over every configured domain.
//!
//! Each domain gets its own task. A task waits for the rate limiter, queries
//! its registry, picks the first `expiration` event and parses its date, then
//! takes the accumulator lock just long enough to record one data point. A
//! failure at any step drops that domain from the cycle and is logged; it
//! never touches another domain's result or fails the cycle.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use reqwest::Client;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{Config, DomainTarget, HttpClientConfig, MetricsConfig, RdapConfig};
use crate::date::parse_expiry_time;
use crate::error::{LapseError, Result};
use crate::metrics::{Metrics, MetricsBuilder};
use crate::ratelimit::RateLimiter;
use crate::rdap::{build_transport, RdapClient};
use crate::registry::{RegistryClient, RegistryClients};
use crate::whois::WhoisClient;

/// How a single domain fared in a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DomainOutcome {
    Recorded,
    NoExpiration,
    QueryFailed,
    ParseFailed,
    Cancelled,
}

#[derive(Debug, Default)]
struct CycleSummary {
    recorded: usize,
    no_expiration: usize,
    failed: usize,
    cancelled: usize,
}

impl CycleSummary {
    fn add(&mut self, outcome: DomainOutcome) {
        match outcome {
            DomainOutcome::Recorded => self.recorded += 1,
            DomainOutcome::NoExpiration => self.no_expiration += 1,
            DomainOutcome::QueryFailed | DomainOutcome::ParseFailed => self.failed += 1,
            DomainOutcome::Cancelled => self.cancelled += 1,
        }
    }
}

struct DomainTask {
    target: DomainTarget,
    client: Arc<dyn RegistryClient>,
    rate_limiter: Arc<RateLimiter>,
    builder: Arc<Mutex<MetricsBuilder>>,
    cancel: CancellationToken,
    observed_at: DateTime<Utc>,
}

impl DomainTask {
    async fn run(self) -> DomainOutcome {
        let name = self.target.name.as_str();

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                warn!(domain = %name, "Lookup abandoned, scrape cancelled");
                return DomainOutcome::Cancelled;
            }
            _ = self.rate_limiter.admit() => {}
        }

        let queried = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                warn!(domain = %name, "Lookup abandoned, scrape cancelled");
                return DomainOutcome::Cancelled;
            }
            result = self.client.query_domain(name) => result,
        };

        let record = match queried {
            Ok(record) => record,
            Err(e) => {
                error!(domain = %name, error = %e, "Failed to fetch registry data");
                return DomainOutcome::QueryFailed;
            }
        };

        let Some(event) = record.expiration_event() else {
            debug!(domain = %name, "No expiration event in registry data");
            return DomainOutcome::NoExpiration;
        };

        let expiry = match parse_expiry_time(&event.date) {
            Ok(expiry) => expiry,
            Err(e) => {
                error!(
                    domain = %name,
                    date = %event.date,
                    error = %e,
                    "Failed to parse expiry date"
                );
                return DomainOutcome::ParseFailed;
            }
        };

        self.builder
            .lock()
            .await
            .record_domain_expiry_time(self.observed_at, expiry, name);

        debug!(domain = %name, expiry = %expiry, "Recorded domain expiry");
        DomainOutcome::Recorded
    }
}

/// Scrapes registration expiry for a fixed set of domains.
///
/// Built from configuration, then started once to acquire the registry
/// clients. The rate limiter lives as long as the scraper, so its budget is
/// shared by every cycle.
#[derive(Debug)]
pub struct DomainScraper {
    targets: Vec<DomainTarget>,
    http: HttpClientConfig,
    rdap: RdapConfig,
    metrics: MetricsConfig,
    rate_limiter: Arc<RateLimiter>,
    clients: Option<RegistryClients>,
}

impl DomainScraper {
    pub fn new(config: &Config) -> Self {
        Self {
            targets: config.domains.clone(),
            http: config.http.clone(),
            rdap: config.rdap.clone(),
            metrics: config.metrics,
            rate_limiter: Arc::new(RateLimiter::new(config.rate_budget())),
            clients: None,
        }
    }

    pub fn targets(&self) -> &[DomainTarget] {
        &self.targets
    }

    pub fn is_started(&self) -> bool {
        self.clients.is_some()
    }

    /// Builds the HTTP transport from configuration and starts on it.
    pub fn start(&mut self) -> Result<()> {
        let http = build_transport(&self.http)?;
        self.start_with_transport(http);
        Ok(())
    }

    /// Starts on an HTTP transport built by the caller.
    pub fn start_with_transport(&mut self, http: Client) {
        let clients = RegistryClients::new()
            .with_client(Arc::new(RdapClient::new(http, self.rdap.clone())))
            .with_client(Arc::new(WhoisClient::new()));
        self.start_with_clients(clients);
    }

    pub fn start_with_clients(&mut self, clients: RegistryClients) {
        self.clients = Some(clients);
    }

    /// Runs one cycle and returns its batch.
    ///
    /// Every record in the batch carries the same `observed_at`, taken once
    /// when the cycle begins. Cancelling `cancel` makes in-flight lookups give
    /// up at their next suspension point; whatever was recorded by then is
    /// still returned. The only error is calling this before [`start`].
    ///
    /// [`start`]: DomainScraper::start
    pub async fn scrape(&self, cancel: CancellationToken) -> Result<Metrics> {
        let clients = self.clients.as_ref().ok_or(LapseError::ScraperNotStarted)?;

        let observed_at = Utc::now();
        let started = Instant::now();
        let builder = Arc::new(Mutex::new(MetricsBuilder::new(self.metrics)));
        let mut summary = CycleSummary::default();
        let mut tasks = JoinSet::new();

        debug!(domains = self.targets.len(), "Starting scrape cycle");

        for target in &self.targets {
            let Some(client) = clients.get(target.protocol) else {
                error!(
                    domain = %target.name,
                    protocol = %target.protocol,
                    "No registry client for protocol"
                );
                summary.add(DomainOutcome::QueryFailed);
                continue;
            };

            let task = DomainTask {
                target: target.clone(),
                client,
                rate_limiter: self.rate_limiter.clone(),
                builder: builder.clone(),
                cancel: cancel.clone(),
                observed_at,
            };
            tasks.spawn(task.run());
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => summary.add(outcome),
                Err(e) => {
                    error!(error = %e, "Domain lookup task failed");
                    summary.add(DomainOutcome::QueryFailed);
                }
            }
        }

        let metrics = builder.lock().await.emit(observed_at);

        if cancel.is_cancelled() {
            warn!(cancelled = summary.cancelled, "Scrape cycle was cancelled");
        }
        info!(
            domains = self.targets.len(),
            recorded = summary.recorded,
            no_expiration = summary.no_expiration,
            failed = summary.failed,
            cancelled = summary.cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scrape cycle finished"
        );

        Ok(metrics)
    }
}
