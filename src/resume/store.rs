//! Checkpoint persistence.
//!
//! The checkpoint is a URL → processed mapping serialized as a bare JSON
//! object, e.g. `{"https://example/race/1": true}`. It is the sole source
//! of idempotency across runs: a URL present in the map is never fetched or
//! classified again, whatever its original outcome was.

use fd_lock::RwLock;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Maximum allowed checkpoint file size (10 MB) to prevent memory exhaustion
pub const MAX_CHECKPOINT_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Errors related to checkpoint persistence.
///
/// Only `save` surfaces these; `load` absorbs every failure into an empty
/// store so a damaged checkpoint can never fail a run.
#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    DeserializationError(String),

    /// Checkpoint file too large
    #[error("checkpoint file too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge {
        /// Actual file size
        size: u64,
        /// Maximum allowed size
        max: u64,
    },

    /// Lock error
    #[error("lock error: {0}")]
    LockError(String),
}

/// Durable record of which candidate pages already reached a terminal
/// classification.
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    entries: BTreeMap<String, bool>,
}

impl CheckpointStore {
    /// Load the store from `path`.
    ///
    /// A missing or corrupt backing file yields an empty store with a
    /// warning; this function never fails the run.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match Self::try_load(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Checkpoint unreadable, starting empty");
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    fn try_load(path: &Path) -> Result<BTreeMap<String, bool>, ResumeError> {
        if !path.exists() {
            debug!(path = %path.display(), "No checkpoint file, starting empty");
            return Ok(BTreeMap::new());
        }

        let metadata =
            std::fs::metadata(path).map_err(|e| ResumeError::IoError(e.to_string()))?;
        if metadata.len() > MAX_CHECKPOINT_FILE_SIZE {
            return Err(ResumeError::FileTooLarge {
                size: metadata.len(),
                max: MAX_CHECKPOINT_FILE_SIZE,
            });
        }

        let contents =
            std::fs::read_to_string(path).map_err(|e| ResumeError::IoError(e.to_string()))?;

        let entries: BTreeMap<String, bool> = serde_json::from_str(&contents)
            .map_err(|e| ResumeError::DeserializationError(e.to_string()))?;

        info!(
            path = %path.display(),
            entries = entries.len(),
            "Checkpoint loaded"
        );
        Ok(entries)
    }

    /// Whether a candidate page URL has already reached a terminal state.
    pub fn is_processed(&self, url: &str) -> bool {
        self.entries.get(url).copied().unwrap_or(false)
    }

    /// Record a candidate page as processed. In-memory only; durable on the
    /// next [`save`](Self::save).
    pub fn mark_processed(&mut self, url: &str) {
        self.entries.insert(url.to_string(), true);
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the full mapping atomically.
    ///
    /// Writes to a temp file in the same directory, fsyncs, then renames
    /// over the target, so a concurrent reader never observes a
    /// half-written file. An `fd-lock` lock file coordinates writers.
    pub fn save(&self) -> Result<(), ResumeError> {
        debug!(
            path = %self.path.display(),
            entries = self.entries.len(),
            "Saving checkpoint"
        );

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ResumeError::IoError(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| ResumeError::SerializationError(e.to_string()))?;

        let lock_path = self.path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| ResumeError::LockError(format!("Failed to create lock file: {e}")))?;

        let mut lock = RwLock::new(lock_file);
        let _guard = lock
            .write()
            .map_err(|e| ResumeError::LockError(format!("Failed to acquire write lock: {e}")))?;

        let parent_dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
            .map_err(|e| ResumeError::IoError(format!("Failed to create temp file: {e}")))?;

        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| ResumeError::IoError(format!("Failed to write to temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| ResumeError::IoError(format!("Failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| ResumeError::IoError(format!("Failed to sync temp file: {e}")))?;

        temp_file
            .persist(&self.path)
            .map_err(|e| ResumeError::IoError(format!("Failed to persist temp file: {e}")))?;

        // Fsync parent directory so the rename is durable
        if let Some(parent) = self.path.parent() {
            if let Ok(dir) = std::fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        info!(
            path = %self.path.display(),
            entries = self.entries.len(),
            "Checkpoint saved"
        );
        Ok(())
    }
}
