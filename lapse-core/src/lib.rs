pub mod config;
pub mod controller;
pub mod date;
pub mod error;
pub mod metrics;
pub mod output;
pub mod ratelimit;
pub mod rdap;
pub mod registry;
pub mod scraper;
pub mod validation;
pub mod whois;

pub use error::{LapseError, Result};
pub use validation::normalize_domain;

pub use config::{CaptureFields, Config, DomainTarget, Protocol};
pub use controller::{MetricsExporter, ScrapeController};
pub use date::{parse_expiry_time, DateEncoding};
pub use metrics::{ExpiryRecord, Metrics, MetricsBuilder, DOMAIN_EXPIRY_TIME};
pub use ratelimit::{RateBudget, RateLimiter};
pub use rdap::{RdapClient, RdapResponse};
pub use registry::{DomainRecord, LifecycleEvent, RegistryClient, RegistryClients};
pub use scraper::DomainScraper;
pub use whois::WhoisClient;

pub use output::{OutputFormat, OutputFormatter};
