//! Scrape run configuration.
//!
//! An explicit value passed into the orchestrator at construction; there is
//! no module-level state. Collaborators (fetcher, writer, shutdown token)
//! are injected separately.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Included races between dataset/checkpoint flushes.
/// Bounds data loss on abrupt termination to at most one batch of work.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Base sleep between requests in milliseconds.
/// Mirrors a polite ~1 req/s cadence against a consumer site.
pub const DEFAULT_SLEEP_MS: u64 = 1200;

/// Maximum random jitter added to the base sleep in milliseconds.
pub const DEFAULT_JITTER_MS: u64 = 700;

/// Default race-level output filename.
pub const DEFAULT_RACES_FILE: &str = "races.csv";

/// Default horse-level output filename.
pub const DEFAULT_HORSES_FILE: &str = "horse_odds.csv";

/// Default checkpoint filename.
pub const DEFAULT_CHECKPOINT_FILE: &str = "checkpoint.json";

/// Venue excluded by default: the banei track runs a different race format
/// the extractors do not model.
pub const DEFAULT_EXCLUDED_VENUE: &str = "帯広";

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// First date to process (inclusive)
    pub start_date: NaiveDate,
    /// Last date to process (inclusive)
    pub end_date: NaiveDate,
    /// Directory holding both datasets and the checkpoint
    pub data_dir: PathBuf,
    /// Race-level output filename within `data_dir`
    pub races_file: String,
    /// Horse-level output filename within `data_dir`
    pub horses_file: String,
    /// Checkpoint filename within `data_dir`
    pub checkpoint_file: String,
    /// Included races per flush batch
    pub batch_size: usize,
    /// Venues whose races are skipped
    pub excluded_venues: BTreeSet<String>,
    /// Whether to draw a progress bar over the date range
    pub show_progress: bool,
}

impl ScrapeConfig {
    /// Configuration with defaults for everything but the date range.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            data_dir: PathBuf::from("data"),
            races_file: DEFAULT_RACES_FILE.to_string(),
            horses_file: DEFAULT_HORSES_FILE.to_string(),
            checkpoint_file: DEFAULT_CHECKPOINT_FILE.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            excluded_venues: BTreeSet::from([DEFAULT_EXCLUDED_VENUE.to_string()]),
            show_progress: true,
        }
    }

    /// Path of the checkpoint file.
    pub fn checkpoint_path(&self) -> PathBuf {
        self.data_dir.join(&self.checkpoint_file)
    }

    /// Dates in the configured range, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.start_date
            .iter_days()
            .take_while(|d| *d <= self.end_date)
            .collect()
    }
}
