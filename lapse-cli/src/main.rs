mod display;
mod export;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use lapse_core::config::parse_domains;
use lapse_core::output::OutputFormat;
use lapse_core::{Config, DomainScraper, DomainTarget, ScrapeController};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use display::Spinner;
use export::{stdout_formatter, Exporters, StdoutExporter, TextfileExporter};

#[derive(Parser)]
#[command(name = "lapse")]
#[command(about = "Domain registration expiry exporter - scheduled RDAP lookups as metrics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(short, long, global = true, default_value = "lapse.toml")]
    config: PathBuf,

    /// Output format (human, json or prometheus)
    #[arg(short, long, global = true, default_value = "human")]
    format: String,

    /// Log as JSON lines instead of text
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect expiry metrics on the configured schedule until interrupted
    Run {
        /// Also maintain a Prometheus textfile at this path
        #[arg(long)]
        textfile: Option<PathBuf>,

        /// Do not print batches to stdout (requires --textfile)
        #[arg(short, long, requires = "textfile")]
        quiet: bool,
    },
    /// Run a single collection cycle and print the result
    Check {
        /// Domains to check instead of the configured ones
        domains: Vec<String>,

        /// File containing domains: one per line, # for comments, or CSV (uses first column)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Load and validate the configuration file
    Validate,
}

fn init_tracing(json: bool, default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Commands::Run { .. } => "info",
        _ => "warn",
    };
    init_tracing(cli.log_json, default_level);

    let output_format: OutputFormat = cli.format.parse().map_err(anyhow::Error::msg)?;

    let result = match cli.command {
        Commands::Run { textfile, quiet } => {
            run(&cli.config, output_format, textfile, quiet).await
        }
        Commands::Check { domains, file } => {
            check(&cli.config, output_format, domains, file).await
        }
        Commands::Validate => validate(&cli.config, output_format),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".bright_red(), e);
        std::process::exit(1);
    }
    Ok(())
}

fn read_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(Config::from_toml_str(&content)?)
}

/// Cancels the returned token on the first Ctrl-C.
fn shutdown_on_ctrl_c() -> CancellationToken {
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, shutting down");
                token.cancel();
            }
            Err(e) => warn!(error = %e, "Unable to listen for interrupt signal"),
        }
    });

    shutdown
}

async fn run(
    config_path: &Path,
    format: OutputFormat,
    textfile: Option<PathBuf>,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let controller = ScrapeController::from_config(&config)?;

    let mut exporters = Exporters::default();
    if !quiet {
        exporters.push(StdoutExporter::new(format));
    }
    if let Some(path) = textfile {
        info!(path = %path.display(), "Exporting to Prometheus textfile");
        exporters.push(TextfileExporter::new(path));
    }

    controller.run(&mut exporters, shutdown_on_ctrl_c()).await?;
    Ok(())
}

async fn check(
    config_path: &Path,
    format: OutputFormat,
    domains: Vec<String>,
    file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut adhoc = domains;
    if let Some(file) = file {
        let content = std::fs::read_to_string(&file)
            .with_context(|| format!("reading {}", file.display()))?;
        adhoc.extend(parse_domains(&content));
    }

    // ad-hoc domains work without a config file
    let mut config = if adhoc.is_empty() || config_path.exists() {
        read_config(config_path)?
    } else {
        Config::default()
    };
    if !adhoc.is_empty() {
        config.domains = adhoc.into_iter().map(DomainTarget::rdap).collect();
    }
    config.validate()?;

    let mut scraper = DomainScraper::new(&config);
    scraper.start()?;

    let spinner = (format == OutputFormat::Human && std::io::stderr().is_terminal())
        .then(|| Spinner::for_domains(scraper.targets().len()));

    let controller = ScrapeController::new(scraper).with_timeout(config.timeout());
    let metrics = controller.run_cycle(&shutdown_on_ctrl_c()).await?;

    if let Some(spinner) = spinner {
        spinner.finish();
    }

    println!("{}", stdout_formatter(format).format_metrics(&metrics));
    Ok(())
}

fn validate(config_path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let config = read_config(config_path)?;
    let outcome = config.validate();

    if format == OutputFormat::Json {
        let report = match &outcome {
            Ok(()) => serde_json::json!({
                "valid": true,
                "domains": config.domains.len(),
            }),
            Err(e) => serde_json::json!({
                "valid": false,
                "error": e.to_string(),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if outcome.is_ok() {
        println!(
            "{} {} ({} domains, every {}s)",
            "✓".bright_green(),
            config_path.display(),
            config.domains.len(),
            config.collection_interval_secs
        );
    }

    outcome?;
    Ok(())
}
