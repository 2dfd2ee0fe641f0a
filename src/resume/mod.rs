//! Checkpoint store for idempotent resume.

mod store;

pub use store::{CheckpointStore, ResumeError, MAX_CHECKPOINT_FILE_SIZE};
