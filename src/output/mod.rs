//! Dataset output writers.

use crate::{HorseOddsRow, RaceRecord};
use std::path::Path;

mod csv;

pub use csv::CsvSnapshot;

/// Output writer errors.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    CsvError(String),
}

/// Result type for output operations.
pub type OutputResult<T> = Result<T, OutputError>;

/// Full-snapshot dataset persistence.
///
/// A flush is idempotent "save full state": each write replaces the whole
/// table with the accumulated records, it never appends a delta. Readers
/// exist so a resumed run can seed its accumulators from the previous
/// snapshot before writing again.
pub trait SnapshotWriter: Send {
    /// Replace the race-level table with the given records.
    fn write_races(&self, races: &[RaceRecord]) -> OutputResult<u64>;

    /// Replace the horse-level table with the given rows.
    fn write_horses(&self, rows: &[HorseOddsRow]) -> OutputResult<u64>;

    /// Read the current race-level snapshot; missing file yields empty.
    fn read_races(&self) -> OutputResult<Vec<RaceRecord>>;

    /// Read the current horse-level snapshot; missing file yields empty.
    fn read_horses(&self) -> OutputResult<Vec<HorseOddsRow>>;

    /// Path of the race-level table.
    fn races_path(&self) -> &Path;

    /// Path of the horse-level table.
    fn horses_path(&self) -> &Path;
}
