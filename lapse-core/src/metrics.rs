//! Metrics accumulation for one scrape cycle.
//!
//! [`MetricsBuilder`] collects data points through `&mut self` and is not
//! meant to be shared without a lock. [`MetricsBuilder::emit`] turns what was
//! collected into an immutable [`Metrics`] batch, ordered by domain so the
//! output does not depend on the order lookups finished in.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MetricsConfig;

pub const DOMAIN_EXPIRY_TIME: &str = "domain.expiry.time";
pub const DOMAIN_EXPIRY_TIME_DESCRIPTION: &str =
    "Unix timestamp at which the domain registration expires.";

/// Expiry of one domain as seen in one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryRecord {
    pub domain: String,
    pub expiry: DateTime<Utc>,
    pub observed_at: DateTime<Utc>,
}

impl ExpiryRecord {
    /// Value exported for the record: whole seconds since the Unix epoch.
    pub fn expiry_unix(&self) -> i64 {
        self.expiry.timestamp()
    }

    pub fn days_until_expiry(&self) -> i64 {
        (self.expiry - self.observed_at).num_days()
    }
}

#[derive(Debug)]
pub struct MetricsBuilder {
    config: MetricsConfig,
    records: Vec<ExpiryRecord>,
}

impl MetricsBuilder {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            records: Vec::new(),
        }
    }

    /// Records a `domain.expiry.time` data point. No-op when the metric is disabled.
    pub fn record_domain_expiry_time(
        &mut self,
        observed_at: DateTime<Utc>,
        expiry: DateTime<Utc>,
        domain: &str,
    ) {
        if !self.config.domain_expiry_time.enabled {
            return;
        }

        self.records.push(ExpiryRecord {
            domain: domain.to_string(),
            expiry,
            observed_at,
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Produces the batch and leaves the builder empty for reuse.
    pub fn emit(&mut self, observed_at: DateTime<Utc>) -> Metrics {
        let mut records = std::mem::take(&mut self.records);
        records.sort_by(|a, b| a.domain.cmp(&b.domain));

        Metrics {
            observed_at,
            records,
        }
    }
}

/// Batch produced by one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub observed_at: DateTime<Utc>,
    pub records: Vec<ExpiryRecord>,
}

impl Metrics {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, domain: &str) -> Option<&ExpiryRecord> {
        self.records.iter().find(|r| r.domain == domain)
    }

    /// Renders the batch in the Prometheus text exposition format.
    pub fn to_prometheus(&self) -> String {
        let name = prometheus_name(DOMAIN_EXPIRY_TIME);
        let mut out = String::new();

        let _ = writeln!(out, "# HELP {} {}", name, DOMAIN_EXPIRY_TIME_DESCRIPTION);
        let _ = writeln!(out, "# TYPE {} gauge", name);
        for record in &self.records {
            let _ = writeln!(
                out,
                "{}{{domain=\"{}\"}} {} {}",
                name,
                escape_label_value(&record.domain),
                record.expiry_unix(),
                record.observed_at.timestamp_millis()
            );
        }

        out
    }
}

fn prometheus_name(name: &str) -> String {
    name.replace('.', "_")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricConfig;
    use crate::date::parse_expiry_time;
    use chrono::TimeZone;

    fn observed() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_emit_sorts_and_resets() {
        let mut builder = MetricsBuilder::new(MetricsConfig::default());
        let expiry = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

        builder.record_domain_expiry_time(observed(), expiry, "zeta.org");
        builder.record_domain_expiry_time(observed(), expiry, "alpha.com");
        builder.record_domain_expiry_time(observed(), expiry, "mid.net");
        assert_eq!(builder.len(), 3);

        let metrics = builder.emit(observed());
        let domains: Vec<_> = metrics.records.iter().map(|r| r.domain.as_str()).collect();
        assert_eq!(domains, vec!["alpha.com", "mid.net", "zeta.org"]);
        assert!(builder.is_empty());
        assert!(builder.emit(observed()).is_empty());
    }

    #[test]
    fn test_disabled_metric_records_nothing() {
        let config = MetricsConfig {
            domain_expiry_time: MetricConfig { enabled: false },
        };
        let mut builder = MetricsBuilder::new(config);
        builder.record_domain_expiry_time(observed(), observed(), "example.com");
        assert!(builder.emit(observed()).is_empty());
    }

    #[test]
    fn test_parsed_date_exports_same_unix_timestamp() {
        let expiry = parse_expiry_time("2025-01-01T00:00:00Z").unwrap();
        let mut builder = MetricsBuilder::new(MetricsConfig::default());
        builder.record_domain_expiry_time(observed(), expiry, "example.com");

        let metrics = builder.emit(observed());
        assert_eq!(metrics.get("example.com").unwrap().expiry_unix(), 1_735_689_600);
        assert!(metrics
            .to_prometheus()
            .contains("domain_expiry_time{domain=\"example.com\"} 1735689600 "));
    }

    #[test]
    fn test_prometheus_rendering() {
        let mut builder = MetricsBuilder::new(MetricsConfig::default());
        let expiry = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        builder.record_domain_expiry_time(observed(), expiry, "example.com");
        let text = builder.emit(observed()).to_prometheus();

        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "# HELP domain_expiry_time Unix timestamp at which the domain registration expires.",
                "# TYPE domain_expiry_time gauge",
                "domain_expiry_time{domain=\"example.com\"} 1893456000 1767268800000",
            ]
        );
    }

    #[test]
    fn test_label_escaping() {
        assert_eq!(escape_label_value(r#"a"b\c"#), r#"a\"b\\c"#);
    }

    #[test]
    fn test_days_until_expiry() {
        let record = ExpiryRecord {
            domain: "example.com".to_string(),
            expiry: Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap(),
            observed_at: observed(),
        };
        assert_eq!(record.days_until_expiry(), 30);
    }

    #[test]
    fn test_metrics_json_shape() {
        let metrics = Metrics {
            observed_at: observed(),
            records: vec![ExpiryRecord {
                domain: "example.com".to_string(),
                expiry: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
                observed_at: observed(),
            }],
        };
        let value = serde_json::to_value(&metrics).unwrap();
        assert_eq!(value["records"][0]["domain"], "example.com");
        assert_eq!(value["observed_at"], "2026-01-01T12:00:00Z");
    }
}
