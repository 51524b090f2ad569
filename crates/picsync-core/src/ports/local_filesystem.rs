//! Local filesystem port (driven/secondary port)
//!
//! The sync engine only needs three operations: an existence check used as
//! the dedup key, a full-content write, and directory creation.
//!
//! ## Design Notes
//!
//! - `write_all` must never leave a partially written file at `path`. The
//!   adapter writes to a sibling temporary file and renames it into place.
//! - Paths are plain `Path`s; the caller derives them from validated
//!   `FileName`s, so they cannot escape the download directory.

use std::path::Path;

/// Port trait for local filesystem operations
#[async_trait::async_trait]
pub trait ILocalFileSystem: Send + Sync {
    /// Returns true if anything exists at `path`
    async fn exists(&self, path: &Path) -> anyhow::Result<bool>;

    /// Writes `data` to `path`, replacing any previous content atomically
    async fn write_all(&self, path: &Path, data: &[u8]) -> anyhow::Result<()>;

    /// Creates a directory and all missing parents
    async fn create_directory(&self, path: &Path) -> anyhow::Result<()>;
}
