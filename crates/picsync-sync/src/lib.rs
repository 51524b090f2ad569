//! picsync Sync - Incremental synchronization engine
//!
//! Provides:
//! - Exhaustive paginated listing with partial-failure tolerance
//! - The download / backup / advance-cursor cycle
//! - Dated backup container resolution
//! - A fixed-rate scheduler that halts on fatal cycle errors
//!
//! ## Modules
//!
//! - [`paginator`] - Turns page-at-a-time listing into one sequence
//! - [`backup`] - Looks up or creates the `yyyyMM` backup container
//! - [`engine`] - One sync cycle over an explicit [`SyncContext`](picsync_core::domain::SyncContext)
//! - [`scheduler`] - Fixed-rate loop around the engine
//! - [`filesystem`] - Local filesystem adapter (atomic writes)
//! - [`memory`] - Process-local cursor store

pub mod backup;
pub mod engine;
pub mod filesystem;
pub mod memory;
pub mod paginator;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

use std::path::PathBuf;

use picsync_core::domain::DomainError;
use thiserror::Error;

/// Errors that end a sync cycle
///
/// Per-file failures that the failure policy tolerates never surface here;
/// they are recorded in the cycle report instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A download failed under the `abort` failure policy
    #[error("Download of {name} aborted the cycle: {reason}")]
    DownloadAborted { name: String, reason: String },

    /// The remote store rejected the credentials
    #[error("Remote store rejected the credentials: {0}")]
    Unauthorized(String),

    /// The download directory could not be prepared
    #[error("Local storage error at {path}: {reason}")]
    LocalStorage { path: PathBuf, reason: String },

    /// The sync context could not be loaded or saved
    #[error("Failed to persist sync context: {0}")]
    Persistence(String),

    /// A domain-level error propagated from picsync-core
    #[error("Domain error: {0}")]
    DomainError(#[from] DomainError),
}

impl SyncError {
    /// Returns true if the scheduler must stop after this error
    ///
    /// Persistence failures leave the in-memory context intact, so the
    /// process can keep syncing; everything else halts the schedule.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SyncError::Persistence(_))
    }
}
