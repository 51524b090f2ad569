//! Domain entities and business logic
//!
//! This module contains the core domain types for picsync:
//! - Newtypes for remote ids, file names and backup periods
//! - Remote file descriptors and download records
//! - The sync watermark and the per-process sync context
//! - The cycle state machine and cycle report
//! - The provider-neutral listing filter
//! - Domain-specific error types

pub mod cursor;
pub mod cycle;
pub mod descriptor;
pub mod errors;
pub mod newtypes;
pub mod query;

// Re-export commonly used types
pub use cursor::{BackupContainer, SyncContext, SyncCursor};
pub use cycle::{CycleReport, CycleState};
pub use descriptor::{DownloadRecord, RemoteFileDescriptor, FOLDER_MIME_TYPE};
pub use errors::DomainError;
pub use newtypes::*;
pub use query::ListQuery;
