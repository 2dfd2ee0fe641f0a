//! Scrape command implementation

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

use crate::fetcher::{HttpFetcher, Pacer};
use crate::output::CsvSnapshot;
use crate::pipeline::{config, Orchestrator, ScrapeConfig, ScrapeSummary};
use crate::rules::SiteRules;
use crate::shutdown::SharedShutdown;

use super::CliError;

/// Keiba Scraper CLI
#[derive(Parser, Debug)]
#[command(name = "keiba-scraper")]
#[command(about = "Scrape local horse racing results into CSV datasets", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Data directory for datasets and the checkpoint (default: "data")
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scrape a date range of race results
    Scrape(ScrapeArgs),

    /// Serve the produced CSV datasets over HTTP
    Serve(super::ServeArgs),
}

/// Scrape command arguments
#[derive(Parser, Debug)]
pub struct ScrapeArgs {
    /// First date to process, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: String,

    /// Last date to process, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: String,

    /// Included races per snapshot/checkpoint flush
    #[arg(long, default_value_t = config::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Base sleep between requests in milliseconds
    #[arg(long, default_value_t = config::DEFAULT_SLEEP_MS)]
    pub sleep_ms: u64,

    /// Maximum random jitter added to the base sleep in milliseconds
    #[arg(long, default_value_t = config::DEFAULT_JITTER_MS)]
    pub jitter_ms: u64,

    /// Venue to exclude; repeatable (default: 帯広)
    #[arg(long = "exclude")]
    pub excluded_venues: Vec<String>,

    /// Override the target site's base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Disable the progress bar
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

fn parse_date(label: &str, input: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| CliError::InvalidArgument(format!("Invalid {label}: {e}")))
}

fn output_json(summary: &ScrapeSummary) {
    let output = serde_json::json!({
        "dates_processed": summary.dates_processed,
        "discovered": summary.discovered,
        "already_processed": summary.already_processed,
        "skipped_excluded": summary.skipped_excluded,
        "skipped_incomplete": summary.skipped_incomplete,
        "included": summary.included,
        "horse_rows": summary.horse_rows,
        "interrupted": summary.interrupted,
        "races_path": summary.races_path.display().to_string(),
        "horses_path": summary.horses_path.display().to_string(),
    });
    println!("{}", serde_json::to_string(&output).unwrap_or_default());
}

fn output_human(summary: &ScrapeSummary) {
    if summary.interrupted {
        println!("\nScrape interrupted - progress saved, rerun to resume.");
    } else {
        println!("\nScrape completed successfully!");
    }
    println!("Dates processed: {}", summary.dates_processed);
    println!("Candidates discovered: {}", summary.discovered);
    println!("Already processed: {}", summary.already_processed);
    println!(
        "Skipped: {} excluded, {} incomplete",
        summary.skipped_excluded, summary.skipped_incomplete
    );
    println!("Races included: {}", summary.included);
    println!("Horse rows: {}", summary.horse_rows);
    println!("Race dataset: {}", summary.races_path.display());
    println!("Horse dataset: {}", summary.horses_path.display());
}

impl ScrapeArgs {
    /// Execute the scrape command.
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        let start_date = parse_date("start date", &self.start_date)?;
        let end_date = parse_date("end date", &self.end_date)?;
        if end_date < start_date {
            return Err(CliError::InvalidArgument(format!(
                "End date {end_date} is before start date {start_date}"
            )));
        }
        if self.batch_size == 0 {
            return Err(CliError::InvalidArgument(
                "Batch size must be at least 1".to_string(),
            ));
        }

        let mut scrape_config = ScrapeConfig::new(start_date, end_date);
        if let Some(data_dir) = &cli.data_dir {
            scrape_config.data_dir = data_dir.clone();
        }
        scrape_config.batch_size = self.batch_size;
        scrape_config.show_progress = !self.no_progress;
        if !self.excluded_venues.is_empty() {
            scrape_config.excluded_venues = self.excluded_venues.iter().cloned().collect();
        }

        let mut rules = SiteRules::default();
        if let Some(base_url) = &self.base_url {
            rules.base_url = base_url.trim_end_matches('/').to_string();
        }
        let fetcher = Box::new(HttpFetcher::new(Pacer::new_millis(
            self.sleep_ms,
            self.jitter_ms,
        ))?);
        let writer = Box::new(CsvSnapshot::new(
            &scrape_config.data_dir,
            &scrape_config.races_file,
            &scrape_config.horses_file,
        ));

        info!(
            start = %start_date,
            end = %end_date,
            data_dir = %scrape_config.data_dir.display(),
            "Scrape command starting"
        );

        let mut orchestrator = Orchestrator::new(scrape_config, rules, fetcher, writer, shutdown)?;
        let summary = orchestrator.run().await?;

        match cli.output_format {
            OutputFormat::Json => output_json(&summary),
            OutputFormat::Human => output_human(&summary),
        }

        Ok(())
    }
}
