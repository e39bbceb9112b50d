use colored::Colorize;

use super::OutputFormatter;
use crate::metrics::{ExpiryRecord, Metrics};

const CRITICAL_DAYS: i64 = 30;
const WARNING_DAYS: i64 = 90;

pub struct HumanFormatter {
    use_colors: bool,
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self { use_colors: true }
    }

    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    fn label(&self, text: &str) -> String {
        if self.use_colors {
            text.bright_cyan().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn value(&self, text: &str) -> String {
        if self.use_colors {
            text.bright_white().to_string()
        } else {
            text.to_string()
        }
    }

    fn warning(&self, text: &str) -> String {
        if self.use_colors {
            text.bright_yellow().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn error(&self, text: &str) -> String {
        if self.use_colors {
            text.bright_red().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn muted(&self, text: &str) -> String {
        if self.use_colors {
            text.bright_black().to_string()
        } else {
            text.to_string()
        }
    }

    fn header(&self, text: &str) -> String {
        if self.use_colors {
            format!("\n{}\n{}", text.bright_purple().bold(), "─".repeat(text.len()).white())
        } else {
            format!("\n{}\n{}", text, "-".repeat(text.len()))
        }
    }

    fn expiry_status(&self, record: &ExpiryRecord) -> String {
        let days = record.days_until_expiry();
        let date = record.expiry.format("%Y-%m-%d").to_string();

        if days < 0 {
            self.error(&format!("{} (expired {} days ago!)", date, -days))
        } else if days < CRITICAL_DAYS {
            self.error(&format!("{} (expires in {} days!)", date, days))
        } else if days < WARNING_DAYS {
            self.warning(&format!("{} ({} days)", date, days))
        } else {
            self.value(&format!("{} ({} days)", date, days))
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_metrics(&self, metrics: &Metrics) -> String {
        let mut output = Vec::new();

        output.push(self.header("Domain expiry"));
        output.push(format!(
            "  {}: {}",
            self.label("Observed"),
            self.value(&metrics.observed_at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        ));

        if metrics.is_empty() {
            output.push(format!("  {}", self.muted("No expiry data collected")));
            return output.join("\n");
        }

        let width = metrics
            .records
            .iter()
            .map(|r| r.domain.len())
            .max()
            .unwrap_or(0);

        for record in &metrics.records {
            // pad before colouring so escape codes don't skew alignment
            let domain = format!("{:width$}", record.domain, width = width);
            output.push(format!(
                "  {}  {}",
                self.label(&domain),
                self.expiry_status(record)
            ));
        }

        output.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn record(domain: &str, days: i64) -> ExpiryRecord {
        let observed_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        ExpiryRecord {
            domain: domain.to_string(),
            expiry: observed_at + Duration::days(days),
            observed_at,
        }
    }

    #[test]
    fn test_format_plain() {
        let metrics = Metrics {
            observed_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            records: vec![record("example.com", 400), record("soon.io", 10), record("gone.net", -3)],
        };
        let out = HumanFormatter::new().without_colors().format_metrics(&metrics);

        assert!(out.contains("Observed: 2026-01-01 00:00:00 UTC"));
        assert!(out.contains("example.com  2027-02-05 (400 days)"));
        assert!(out.contains("soon.io      2026-01-11 (expires in 10 days!)"));
        assert!(out.contains("gone.net     2025-12-29 (expired 3 days ago!)"));
    }

    #[test]
    fn test_format_empty() {
        let metrics = Metrics {
            observed_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            records: Vec::new(),
        };
        let out = HumanFormatter::new().without_colors().format_metrics(&metrics);
        assert!(out.contains("No expiry data collected"));
    }
}
