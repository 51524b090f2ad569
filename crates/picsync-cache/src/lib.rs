//! picsync Cache - Persistent sync state
//!
//! SQLite-backed storage for the sync context: the watermark of the last
//! completed cycle and the cached backup container of the current period.
//!
//! ## Architecture
//!
//! This crate implements the `ICursorStore` port from `picsync-core`
//! using SQLite as the storage backend. It is a driven (secondary) adapter
//! in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteCursorStore`] - `ICursorStore` implementation
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use picsync_cache::{DatabasePool, SqliteCursorStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/picsync/state.db")).await?;
//! let store = SqliteCursorStore::new(pool.pool().clone());
//! // Use store as ICursorStore...
//! # Ok(())
//! # }
//! ```

pub mod cursor_store;
pub mod pool;

pub use cursor_store::SqliteCursorStore;
pub use pool::DatabasePool;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be turned back into a domain type
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}
