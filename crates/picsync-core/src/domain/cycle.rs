//! Sync cycle state machine and per-cycle report
//!
//! A cycle walks `Idle → Listing → Downloading → BackingUp →
//! AdvancingCursor → Idle`. Listing may go straight to `AdvancingCursor`
//! when nothing matched, and Downloading may skip `BackingUp` when the
//! backup move is disabled or nothing was downloaded. `Aborted` is reachable
//! from every non-idle state and is terminal.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::descriptor::DownloadRecord;
use super::errors::DomainError;
use super::newtypes::CycleId;

// ============================================================================
// CycleState
// ============================================================================

/// Step a sync cycle is currently in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    /// No cycle in flight
    #[default]
    Idle,
    /// Listing candidate files (and checking the backup container)
    Listing,
    /// Fetching content for new files
    Downloading,
    /// Moving downloaded files into the backup container
    BackingUp,
    /// Recording the new watermark
    AdvancingCursor,
    /// A fatal error ended the cycle; the watermark was not moved
    Aborted(String),
}

impl CycleState {
    /// Short name of the state, without payload
    pub fn name(&self) -> &'static str {
        match self {
            CycleState::Idle => "Idle",
            CycleState::Listing => "Listing",
            CycleState::Downloading => "Downloading",
            CycleState::BackingUp => "BackingUp",
            CycleState::AdvancingCursor => "AdvancingCursor",
            CycleState::Aborted(_) => "Aborted",
        }
    }

    /// Returns true for the terminal aborted state
    pub fn is_aborted(&self) -> bool {
        matches!(self, CycleState::Aborted(_))
    }

    /// Checks whether moving to `target` is a legal step
    pub fn can_transition_to(&self, target: &CycleState) -> bool {
        match (self, target) {
            (CycleState::Aborted(_), _) => false,
            (CycleState::Idle, CycleState::Aborted(_)) => false,
            (_, CycleState::Aborted(_)) => true,

            (CycleState::Idle, CycleState::Listing) => true,

            (CycleState::Listing, CycleState::Downloading) => true,
            (CycleState::Listing, CycleState::AdvancingCursor) => true,

            (CycleState::Downloading, CycleState::BackingUp) => true,
            (CycleState::Downloading, CycleState::AdvancingCursor) => true,

            (CycleState::BackingUp, CycleState::AdvancingCursor) => true,

            (CycleState::AdvancingCursor, CycleState::Idle) => true,

            _ => false,
        }
    }

    /// Moves to `target`, rejecting illegal steps
    ///
    /// # Errors
    /// Returns `DomainError::InvalidState` if the transition is not allowed
    pub fn transition_to(&mut self, target: CycleState) -> Result<(), DomainError> {
        if !self.can_transition_to(&target) {
            return Err(DomainError::InvalidState {
                from: self.name().to_string(),
                to: target.name().to_string(),
            });
        }
        *self = target;
        Ok(())
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleState::Aborted(reason) => write!(f, "aborted: {}", reason),
            other => write!(f, "{}", other.name()),
        }
    }
}

// ============================================================================
// CycleReport
// ============================================================================

/// Summary of one sync cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Correlation id used in log records for this cycle
    pub cycle_id: CycleId,
    /// Instant captured at the start of the cycle
    pub started_at: DateTime<Utc>,
    /// Number of descriptors returned by the listing
    pub listed: usize,
    /// Number of listing pages fetched successfully
    pub pages: u32,
    /// False when a page failed and the listing stopped early
    pub listing_complete: bool,
    /// Files fetched during this cycle
    pub downloaded: Vec<DownloadRecord>,
    /// Names skipped because a local copy already existed
    pub skipped: Vec<String>,
    /// Number of files moved into the backup container
    pub backed_up: u32,
    /// Non-fatal errors, one message per failed file or operation
    pub errors: Vec<String>,
    /// State the cycle ended in
    pub final_state: CycleState,
    /// Watermark after the cycle
    pub cursor_after: DateTime<Utc>,
    /// Wall-clock duration of the cycle in milliseconds
    pub duration_ms: u64,
}

impl CycleReport {
    /// Empty report for a cycle starting at `started_at`
    pub fn new(started_at: DateTime<Utc>, cursor: DateTime<Utc>) -> Self {
        Self {
            cycle_id: CycleId::new(),
            started_at,
            listed: 0,
            pages: 0,
            listing_complete: true,
            downloaded: Vec::new(),
            skipped: Vec::new(),
            backed_up: 0,
            errors: Vec::new(),
            final_state: CycleState::Idle,
            cursor_after: cursor,
            duration_ms: 0,
        }
    }

    /// Local paths of everything downloaded in this cycle
    pub fn downloaded_paths(&self) -> Vec<std::path::PathBuf> {
        self.downloaded
            .iter()
            .map(|r| r.local_path.clone())
            .collect()
    }

    /// Returns true if nothing was downloaded and no error was recorded
    pub fn is_noop(&self) -> bool {
        self.downloaded.is_empty() && self.errors.is_empty()
    }
}
