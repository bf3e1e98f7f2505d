//! Tracking snapshot of files last seen up to date.
//!
//! The snapshot only lets a non-forced run skip files that did not change
//! since they were last found up to date. It never decides a status.

mod sqlite;

pub use sqlite::SqliteTrackingStore;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};

use crate::reconcile::{ReconcileStatus, ReconciliationResult};
use crate::scanner::LocalFile;

/// Recorded `created_at` per path.
pub type TrackingSnapshot = BTreeMap<PathBuf, DateTime<FixedOffset>>;

/// Error type for tracking operations.
#[derive(Debug)]
pub enum TrackingError {
    /// Database error.
    Database(String),
    /// A stored timestamp could not be parsed.
    Corrupt { path: String, value: String },
}

impl fmt::Display for TrackingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingError::Database(msg) => write!(f, "Database error: {}", msg),
            TrackingError::Corrupt { path, value } => {
                write!(f, "Invalid timestamp {:?} recorded for {}", value, path)
            }
        }
    }
}

impl std::error::Error for TrackingError {}

impl From<rusqlite::Error> for TrackingError {
    fn from(e: rusqlite::Error) -> Self {
        TrackingError::Database(e.to_string())
    }
}

/// Persistence for the tracking snapshot.
pub trait TrackingStore: Send + Sync {
    fn load(&self) -> Result<TrackingSnapshot, TrackingError>;

    /// Replace the stored snapshot.
    fn save(&self, snapshot: &TrackingSnapshot) -> Result<(), TrackingError>;
}

/// Whether `file` is recorded with the same creation time.
pub fn is_unchanged(snapshot: &TrackingSnapshot, file: &LocalFile) -> bool {
    snapshot
        .get(&file.path)
        .is_some_and(|recorded| *recorded == file.created_at)
}

/// Snapshot after a run: up-to-date files recorded, everything else dropped.
///
/// Paths not among `results` (vanished, or not scanned) are pruned.
pub fn next_snapshot(results: &[ReconciliationResult]) -> TrackingSnapshot {
    results
        .iter()
        .filter(|r| r.status == ReconcileStatus::UpToDate)
        .map(|r| (r.file.path.clone(), r.file.created_at.fixed_offset()))
        .collect()
}
