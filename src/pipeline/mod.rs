//! Pipeline orchestration.

use crate::output::OutputError;
use crate::resume::ResumeError;
use std::path::PathBuf;

pub mod config;
mod orchestrator;

pub use config::ScrapeConfig;
pub use orchestrator::Orchestrator;

/// Terminal classification of one candidate page.
///
/// All three are terminal: the checkpoint marks the page processed whichever
/// one is reached, and the pipeline never retries a URL across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// Venue missing or in the exclusion set
    SkippedExcluded,
    /// Odds or payout link missing, or the odds table yielded zero rows
    SkippedIncomplete,
    /// A race record and its horse rows were appended
    Included,
}

/// Pipeline errors.
///
/// Only persistence failures are fatal; transport and parse failures are
/// absorbed as page outcomes.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Dataset write/read failure
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// Checkpoint persistence failure
    #[error("checkpoint error: {0}")]
    Resume(#[from] ResumeError),
}

/// Counters and artifacts from one pipeline run.
#[derive(Debug, Clone)]
pub struct ScrapeSummary {
    /// Dates visited before completion or interruption
    pub dates_processed: u64,
    /// Candidate pages produced by discovery
    pub discovered: u64,
    /// Candidates skipped because the checkpoint already held them
    pub already_processed: u64,
    /// Pages classified as excluded
    pub skipped_excluded: u64,
    /// Pages classified as incomplete
    pub skipped_incomplete: u64,
    /// Races included this run
    pub included: u64,
    /// Horse rows appended this run
    pub horse_rows: u64,
    /// Whether the run ended early on a shutdown request
    pub interrupted: bool,
    /// Race-level output artifact
    pub races_path: PathBuf,
    /// Horse-level output artifact
    pub horses_path: PathBuf,
}
