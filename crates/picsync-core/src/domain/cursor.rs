//! Sync watermark, backup container cache and the per-process sync context
//!
//! ## Design Notes
//!
//! - [`SyncCursor`] only moves forward. [`SyncCursor::advance_to`] with an
//!   earlier instant leaves the watermark where it is.
//! - [`SyncContext`] is the only state that crosses cycle boundaries. It is
//!   handed to the engine by its owner (the scheduler or the CLI) and
//!   persisted through the `ICursorStore` port.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{BackupPeriod, RemoteId};

// ============================================================================
// SyncCursor
// ============================================================================

/// Timestamp boundary below which remote changes are assumed synchronized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCursor {
    last_sync_time: DateTime<Utc>,
}

impl SyncCursor {
    /// Cursor for a first run: the Unix epoch
    #[must_use]
    pub fn beginning() -> Self {
        Self {
            last_sync_time: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Cursor positioned at an explicit instant
    #[must_use]
    pub fn at(last_sync_time: DateTime<Utc>) -> Self {
        Self { last_sync_time }
    }

    #[must_use]
    pub fn last_sync_time(&self) -> DateTime<Utc> {
        self.last_sync_time
    }

    /// Returns true while no cycle has ever completed
    #[must_use]
    pub fn is_beginning(&self) -> bool {
        self.last_sync_time == DateTime::<Utc>::UNIX_EPOCH
    }

    /// Move the watermark forward to `instant`
    ///
    /// Returns true if the cursor moved.
    pub fn advance_to(&mut self, instant: DateTime<Utc>) -> bool {
        if instant > self.last_sync_time {
            self.last_sync_time = instant;
            true
        } else {
            false
        }
    }
}

impl Default for SyncCursor {
    fn default() -> Self {
        Self::beginning()
    }
}

// ============================================================================
// BackupContainer
// ============================================================================

/// Dated remote container that processed files are moved into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupContainer {
    pub period: BackupPeriod,
    pub id: RemoteId,
}

impl BackupContainer {
    pub fn new(period: BackupPeriod, id: RemoteId) -> Self {
        Self { period, id }
    }

    /// Container name in the remote store (`yyyyMM`)
    pub fn name(&self) -> String {
        self.period.container_name()
    }

    /// Returns true if this container is the right one for `period`
    pub fn covers(&self, period: BackupPeriod) -> bool {
        self.period == period
    }
}

// ============================================================================
// SyncContext
// ============================================================================

/// State owned by the sync engine for the duration of a cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncContext {
    pub cursor: SyncCursor,
    pub backup: Option<BackupContainer>,
}

impl SyncContext {
    pub fn new(cursor: SyncCursor) -> Self {
        Self {
            cursor,
            backup: None,
        }
    }

    /// Cached backup container, only if it belongs to `period`
    pub fn backup_for(&self, period: BackupPeriod) -> Option<&BackupContainer> {
        self.backup.as_ref().filter(|b| b.covers(period))
    }
}
