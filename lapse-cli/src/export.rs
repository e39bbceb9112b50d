//! Where `lapse run` sends each batch.

use std::ffi::OsString;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use lapse_core::output::{get_formatter, HumanFormatter, JsonFormatter};
use lapse_core::{LapseError, Metrics, MetricsExporter, OutputFormat, OutputFormatter, Result};
use tracing::debug;

/// Formatter for stdout. When stdout is not a terminal human output loses its
/// colours and JSON is written one batch per line.
pub fn stdout_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    formatter_for(format, io::stdout().is_terminal())
}

fn formatter_for(format: OutputFormat, terminal: bool) -> Box<dyn OutputFormatter> {
    match (format, terminal) {
        (OutputFormat::Human, false) => Box::new(HumanFormatter::new().without_colors()),
        (OutputFormat::Json, false) => Box::new(JsonFormatter::new().compact()),
        _ => get_formatter(format),
    }
}

/// Prints every batch to stdout in the chosen format.
pub struct StdoutExporter {
    formatter: Box<dyn OutputFormatter>,
}

impl StdoutExporter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            formatter: stdout_formatter(format),
        }
    }
}

impl MetricsExporter for StdoutExporter {
    fn export(&mut self, metrics: &Metrics) -> Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", self.formatter.format_metrics(metrics))
            .and_then(|_| stdout.flush())
            .map_err(|e| LapseError::ExportError(format!("stdout: {}", e)))
    }
}

/// Rewrites a Prometheus textfile for node_exporter's textfile collector.
///
/// The batch is written next to the target and renamed over it, so the
/// collector never reads a half-written file.
pub struct TextfileExporter {
    path: PathBuf,
}

impl TextfileExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = OsString::from(self.path.as_os_str());
        staging.push(".tmp");
        PathBuf::from(staging)
    }

    fn write(&self, contents: &str) -> io::Result<()> {
        let staging = self.staging_path();
        {
            let mut file = fs::File::create(&staging)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&staging, &self.path)
    }
}

impl MetricsExporter for TextfileExporter {
    fn export(&mut self, metrics: &Metrics) -> Result<()> {
        self.write(&metrics.to_prometheus())
            .map_err(|e| LapseError::ExportError(format!("{}: {}", self.path.display(), e)))?;

        debug!(path = %self.path.display(), records = metrics.len(), "Wrote textfile");
        Ok(())
    }
}

/// Fans one batch out to several exporters; every one is attempted.
#[derive(Default)]
pub struct Exporters {
    exporters: Vec<Box<dyn MetricsExporter + Send>>,
}

impl Exporters {
    pub fn push(&mut self, exporter: impl MetricsExporter + Send + 'static) {
        self.exporters.push(Box::new(exporter));
    }
}

impl MetricsExporter for Exporters {
    fn export(&mut self, metrics: &Metrics) -> Result<()> {
        let mut failures = Vec::new();
        for exporter in &mut self.exporters {
            if let Err(e) = exporter.export(metrics) {
                failures.push(e.to_string());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(LapseError::ExportError(failures.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapse_core::ExpiryRecord;

    fn batch() -> Metrics {
        let observed_at = "2026-01-01T00:00:00Z".parse().unwrap();
        Metrics {
            observed_at,
            records: vec![ExpiryRecord {
                domain: "example.com".to_string(),
                expiry: "2030-01-01T00:00:00Z".parse().unwrap(),
                observed_at,
            }],
        }
    }

    #[test]
    fn test_textfile_replaced_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lapse.prom");
        fs::write(&path, "stale\n").unwrap();

        let mut exporter = TextfileExporter::new(&path);
        exporter.export(&batch()).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# HELP domain_expiry_time"));
        assert!(written.contains("domain_expiry_time{domain=\"example.com\"} 1893456000 1767225600000"));
        assert!(!exporter.staging_path().exists());
    }

    #[test]
    fn test_textfile_missing_directory_is_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = TextfileExporter::new(dir.path().join("missing").join("lapse.prom"));

        match exporter.export(&batch()) {
            Err(LapseError::ExportError(msg)) => assert!(msg.contains("lapse.prom")),
            other => panic!("Expected ExportError, got {:?}", other),
        }
    }

    #[test]
    fn test_piped_output_is_plain() {
        let json = formatter_for(OutputFormat::Json, false).format_metrics(&batch());
        assert_eq!(json.lines().count(), 1);
        assert!(json.contains("\"domain\":\"example.com\""));

        let human = formatter_for(OutputFormat::Human, false).format_metrics(&batch());
        assert!(human.contains("example.com"));
        assert!(!human.contains('\u{1b}'));

        let pretty = formatter_for(OutputFormat::Json, true).format_metrics(&batch());
        assert!(pretty.lines().count() > 1);
    }

    struct Failing;

    impl MetricsExporter for Failing {
        fn export(&mut self, _metrics: &Metrics) -> Result<()> {
            Err(LapseError::ExportError("nope".to_string()))
        }
    }

    #[test]
    fn test_fan_out_attempts_every_exporter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lapse.prom");

        let mut exporters = Exporters::default();
        exporters.push(Failing);
        exporters.push(TextfileExporter::new(&path));

        assert!(exporters.export(&batch()).is_err());
        assert!(path.exists());
    }
}
