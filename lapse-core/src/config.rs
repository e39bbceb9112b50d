//! Exporter configuration.
//!
//! Loaded from TOML. Domain names are not validated here beyond being
//! non-empty and unique; a malformed name surfaces as a query error on the
//! domain it belongs to.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LapseError, Result};
use crate::ratelimit::RateBudget;

pub const IANA_BOOTSTRAP_DNS: &str = "https://data.iana.org/rdap/dns.json";

const DEFAULT_COLLECTION_INTERVAL_SECS: u64 = 15 * 60;
const DEFAULT_INITIAL_DELAY_SECS: u64 = 1;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_USER_AGENT: &str = concat!("lapse/", env!("CARGO_PKG_VERSION"), " (RDAP client)");

/// Registry protocol used to look a domain up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Rdap,
    Whois,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Rdap => write!(f, "rdap"),
            Protocol::Whois => write!(f, "whois"),
        }
    }
}

/// Field names to pick out of a free-text WHOIS response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureFields {
    pub expiration: String,
    #[serde(default)]
    pub last_changed: Option<String>,
}

/// One configured domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainTarget {
    pub name: String,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub capture_fields: Option<CaptureFields>,
}

impl DomainTarget {
    pub fn rdap(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            protocol: Protocol::Rdap,
            capture_fields: None,
        }
    }

    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.name.trim().is_empty() {
            problems.push("domain name must not be empty".to_string());
        }

        match self.protocol {
            Protocol::Rdap => {
                if self.capture_fields.is_some() {
                    problems.push(format!(
                        "{}: capture_fields is only meaningful for the whois protocol",
                        self.name
                    ));
                }
            }
            Protocol::Whois => {
                problems.push(format!(
                    "{}: the whois protocol support is currently in progress",
                    self.name
                ));
                if self.capture_fields.is_none() {
                    problems.push(format!(
                        "{}: capture_fields must be defined when the whois protocol is used",
                        self.name
                    ));
                }
            }
        }

        problems
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpClientConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RdapConfig {
    /// IANA-format bootstrap registry mapping TLDs to RDAP servers.
    pub bootstrap_url: String,
    /// Send every query to this RDAP base URL instead of bootstrapping.
    pub server_url: Option<String>,
}

impl Default for RdapConfig {
    fn default() -> Self {
        Self {
            bootstrap_url: IANA_BOOTSTRAP_DNS.to_string(),
            server_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricConfig {
    pub enabled: bool,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    pub domain_expiry_time: MetricConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub collection_interval_secs: u64,
    pub initial_delay_secs: u64,
    /// Deadline for a single cycle; unset means no deadline.
    pub timeout_secs: Option<u64>,
    /// Maximum registry queries per second. 0 disables rate limiting.
    pub rate_limit: f64,
    pub http: HttpClientConfig,
    pub rdap: RdapConfig,
    pub metrics: MetricsConfig,
    pub domains: Vec<DomainTarget>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collection_interval_secs: DEFAULT_COLLECTION_INTERVAL_SECS,
            initial_delay_secs: DEFAULT_INITIAL_DELAY_SECS,
            timeout_secs: None,
            rate_limit: 0.0,
            http: HttpClientConfig::default(),
            rdap: RdapConfig::default(),
            metrics: MetricsConfig::default(),
            domains: Vec::new(),
        }
    }
}

impl Config {
    /// Reads, parses and validates a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses without validating.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Checks the whole configuration and reports every problem at once.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.domains.is_empty() {
            problems.push("no domains configured".to_string());
        }

        let mut seen = HashSet::new();
        for domain in &self.domains {
            problems.extend(domain.problems());

            let key = domain.name.trim().to_lowercase();
            if !key.is_empty() && !seen.insert(key) {
                problems.push(format!("{}: domain is configured more than once", domain.name));
            }
        }

        if !self.rate_limit.is_finite() {
            problems.push(format!("rate_limit must be a finite number, got {}", self.rate_limit));
        } else if !self.rate_budget().is_representable() {
            problems.push(format!(
                "rate_limit {} is too small to space queries apart",
                self.rate_limit
            ));
        }

        if self.collection_interval_secs == 0 {
            problems.push("collection_interval_secs must be greater than zero".to_string());
        }

        if self.timeout_secs == Some(0) {
            problems.push("timeout_secs must be greater than zero when set".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(LapseError::InvalidConfig(problems))
        }
    }

    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn rate_budget(&self) -> RateBudget {
        RateBudget::from_limit(self.rate_limit)
    }
}

/// Parses a plain domain list: one per line, `#` comments, CSV uses the first column.
pub fn parse_domains(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.split(',').next().unwrap_or(line).trim().to_string())
        .filter(|domain| domain.contains('.'))
        .collect()
}
