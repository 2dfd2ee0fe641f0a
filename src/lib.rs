//! # Keiba Scraper Library
//!
//! A resumable scraper for local horse racing results. Walks a date range of
//! listing pages, discovers race detail pages, extracts race metadata, win
//! odds and trifecta payouts with best-effort heuristics, and persists two
//! CSV datasets (race-level and horse-level) in batched snapshots.
//!
//! ## Features
//!
//! - **Checkpointed Resume**: every candidate page's terminal outcome is
//!   recorded in a durable URL checkpoint; re-running with the same
//!   checkpoint file re-processes nothing
//! - **Batched Persistence**: output snapshots and the checkpoint are
//!   flushed together every N included races, bounding data loss on abrupt
//!   termination
//! - **Graceful Shutdown**: Ctrl+C finishes the in-flight page, flushes, and
//!   exits cleanly
//! - **Table-Driven Heuristics**: all site-specific selectors, URL templates
//!   and vocabularies live in a single replaceable [`SiteRules`] value
//!
//! ## Quick Start
//!
//! ```no_run
//! use keiba_scraper::pipeline::{Orchestrator, ScrapeConfig};
//! use keiba_scraper::fetcher::{HttpFetcher, Pacer};
//! use keiba_scraper::output::CsvSnapshot;
//! use keiba_scraper::rules::SiteRules;
//! use keiba_scraper::shutdown::ShutdownCoordinator;
//! use chrono::NaiveDate;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScrapeConfig::new(
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
//! );
//! let rules = SiteRules::default();
//! let fetcher = Box::new(HttpFetcher::new(Pacer::new_millis(1200, 700))?);
//! let writer = Box::new(CsvSnapshot::new(
//!     &config.data_dir,
//!     &config.races_file,
//!     &config.horses_file,
//! ));
//! let shutdown = ShutdownCoordinator::shared();
//!
//! let mut orchestrator = Orchestrator::new(config, rules, fetcher, writer, shutdown)?;
//! let summary = orchestrator.run().await?;
//! println!("included {} races", summary.included);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`rules`] - Site-specific strategy table (templates, markers, selectors)
//! - [`fetcher`] - Page fetching with timeout, retry and pacing
//! - [`discover`] - Candidate detail-page discovery per calendar date
//! - [`extract`] - Pure, non-throwing page extractors
//! - [`pipeline`] - Orchestration, batching and the per-page state machine
//! - [`resume`] - URL checkpoint store for idempotent resume
//! - [`output`] - CSV snapshot writer/reader
//! - [`serve`] - Download endpoint for the produced datasets
//! - [`shutdown`] - Cooperative cancellation token

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// CLI command implementations
pub mod cli;

/// Candidate page discovery
pub mod discover;

/// Page extractors
pub mod extract;

/// Page fetching
pub mod fetcher;

/// Dataset output writers
pub mod output;

/// Pipeline orchestration
pub mod pipeline;

/// Checkpoint store for idempotent resume
pub mod resume;

/// Site-specific scraping rules
pub mod rules;

/// Download endpoint for produced datasets
pub mod serve;

/// Graceful shutdown coordination
pub mod shutdown;

// Re-export commonly used types
pub use rules::SiteRules;

/// Racing surface of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    /// Turf course
    Turf,
    /// Dirt course
    Dirt,
    /// Surface could not be determined
    Unknown,
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Surface::Turf => "turf",
            Surface::Dirt => "dirt",
            Surface::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Surface {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "turf" => Ok(Surface::Turf),
            "dirt" => Ok(Surface::Dirt),
            "unknown" => Ok(Surface::Unknown),
            _ => Err(format!("Invalid surface: {s}")),
        }
    }
}

/// Running direction of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseDir {
    /// Right-handed (clockwise)
    Right,
    /// Left-handed (counter-clockwise)
    Left,
    /// Straight course
    Straight,
}

impl std::fmt::Display for CourseDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CourseDir::Right => "right",
            CourseDir::Left => "left",
            CourseDir::Straight => "straight",
        };
        write!(f, "{s}")
    }
}

/// Going (track condition) of a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Going {
    /// 良 - good
    Good,
    /// 稍重 - slightly heavy
    SlightlyHeavy,
    /// 重 - heavy
    Heavy,
    /// 不良 - bad
    Bad,
}

impl std::fmt::Display for Going {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Going::Good => "good",
            Going::SlightlyHeavy => "slightly_heavy",
            Going::Heavy => "heavy",
            Going::Bad => "bad",
        };
        write!(f, "{s}")
    }
}

/// One row per discovered race.
///
/// A record exists only for races whose venue is outside the exclusion set
/// and for which both an odds page and a payout page were located and the
/// odds table yielded at least one row. Field order here is the CSV column
/// order of the race-level dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RaceRecord {
    /// Calendar date of the race
    pub date: NaiveDate,
    /// Venue name from the fixed venue vocabulary
    pub track: String,
    /// Race number within the day's card, if detected
    pub race_no: Option<u32>,
    /// Race distance in meters, if detected
    pub distance_m: Option<u32>,
    /// Racing surface
    pub surface: Surface,
    /// Course direction, if detected
    pub course_dir: Option<CourseDir>,
    /// Going (track condition), if detected
    pub going: Option<Going>,
    /// Stable race identifier extracted from the detail URL,
    /// falling back to the URL itself
    pub race_key: String,
    /// Detail page URL this record was built from
    pub detail_url: String,
    /// Odds page URL consulted for the win-odds table
    pub odds_url: String,
    /// Payout page URL consulted for the trifecta result
    pub dividend_url: String,
    /// Trifecta finishing combination, e.g. "3-1-5"; present only
    /// together with `trifecta_pay`
    pub trifecta_combo: Option<String>,
    /// Trifecta payout in yen; present only together with `trifecta_combo`
    pub trifecta_pay: Option<u64>,
}

impl RaceRecord {
    /// Validate record integrity
    pub fn validate(&self) -> Result<(), String> {
        if self.track.is_empty() {
            return Err("Track cannot be empty".to_string());
        }

        if self.race_key.is_empty() {
            return Err("Race key cannot be empty".to_string());
        }

        if self.odds_url.is_empty() || self.dividend_url.is_empty() {
            return Err("Source URLs cannot be empty".to_string());
        }

        if self.trifecta_combo.is_some() != self.trifecta_pay.is_some() {
            return Err("Trifecta combination and payout must be present together".to_string());
        }

        Ok(())
    }
}

/// One row per starter per race.
///
/// `race_key` is a join key against [`RaceRecord::race_key`], not an
/// ownership relation. Field order here is the CSV column order of the
/// horse-level dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HorseOddsRow {
    /// Calendar date of the race
    pub date: NaiveDate,
    /// Venue name
    pub track: String,
    /// Join key against the race-level dataset
    pub race_key: String,
    /// Popularity rank (1 = favorite)
    pub popularity: u32,
    /// Starter (saddlecloth) number
    pub horse_no: u32,
    /// Win odds
    pub win_odds: Decimal,
}

impl HorseOddsRow {
    /// Validate row integrity
    pub fn validate(&self) -> Result<(), String> {
        if self.track.is_empty() {
            return Err("Track cannot be empty".to_string());
        }

        if self.race_key.is_empty() {
            return Err("Race key cannot be empty".to_string());
        }

        if self.popularity == 0 {
            return Err("Popularity rank must be positive".to_string());
        }

        if self.horse_no == 0 {
            return Err("Starter number must be positive".to_string());
        }

        if self.win_odds <= Decimal::ZERO {
            return Err(format!("Win odds must be positive, got {}", self.win_odds));
        }

        Ok(())
    }
}
