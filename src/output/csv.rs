//! CSV snapshot implementation.
//!
//! Column order is the declared field order of [`RaceRecord`] and
//! [`HorseOddsRow`]; absent optional fields render as empty cells, never as
//! a textual "None". Writes go through a temp file in the destination
//! directory and an atomic rename, so a download of the file mid-flush
//! never sees a torn table.

use crate::{HorseOddsRow, RaceRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{OutputError, OutputResult, SnapshotWriter};

/// CSV-backed snapshot writer for both datasets.
#[derive(Debug, Clone)]
pub struct CsvSnapshot {
    races_path: PathBuf,
    horses_path: PathBuf,
}

impl CsvSnapshot {
    /// Create a snapshot writer rooted at `data_dir`.
    pub fn new(
        data_dir: impl AsRef<Path>,
        races_file: impl AsRef<Path>,
        horses_file: impl AsRef<Path>,
    ) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            races_path: data_dir.join(races_file),
            horses_path: data_dir.join(horses_file),
        }
    }

    fn write_table<T: Serialize>(path: &Path, records: &[T]) -> OutputResult<u64> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {e}")))?;
        }

        let parent_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let temp_file = tempfile::NamedTempFile::new_in(parent_dir)
            .map_err(|e| OutputError::IoError(format!("Failed to create temp file: {e}")))?;

        {
            let mut writer = csv::Writer::from_writer(temp_file.as_file());
            for record in records {
                writer
                    .serialize(record)
                    .map_err(|e| OutputError::CsvError(format!("Failed to write record: {e}")))?;
            }
            writer
                .flush()
                .map_err(|e| OutputError::IoError(format!("Failed to flush: {e}")))?;
        }

        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync temp file: {e}")))?;
        temp_file
            .persist(path)
            .map_err(|e| OutputError::IoError(format!("Failed to persist temp file: {e}")))?;

        debug!(path = %path.display(), records = records.len(), "Snapshot written");
        Ok(records.len() as u64)
    }

    fn read_table<T: DeserializeOwned>(path: &Path) -> OutputResult<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| OutputError::CsvError(format!("Failed to open {}: {e}", path.display())))?;

        let mut records = Vec::new();
        for result in reader.deserialize() {
            let record: T = result
                .map_err(|e| OutputError::CsvError(format!("Failed to read record: {e}")))?;
            records.push(record);
        }

        info!(path = %path.display(), records = records.len(), "Snapshot read");
        Ok(records)
    }
}

impl SnapshotWriter for CsvSnapshot {
    fn write_races(&self, races: &[RaceRecord]) -> OutputResult<u64> {
        Self::write_table(&self.races_path, races)
    }

    fn write_horses(&self, rows: &[HorseOddsRow]) -> OutputResult<u64> {
        Self::write_table(&self.horses_path, rows)
    }

    fn read_races(&self) -> OutputResult<Vec<RaceRecord>> {
        Self::read_table(&self.races_path)
    }

    fn read_horses(&self) -> OutputResult<Vec<HorseOddsRow>> {
        Self::read_table(&self.horses_path)
    }

    fn races_path(&self) -> &Path {
        &self.races_path
    }

    fn horses_path(&self) -> &Path {
        &self.horses_path
    }
}
