//! Cursor store port (driven/secondary port)
//!
//! Persists the [`SyncContext`] between process runs. A process-local
//! implementation lives in the sync crate and a SQLite one in the cache
//! crate.

use crate::domain::SyncContext;

/// Port trait for loading and saving the sync context
#[async_trait::async_trait]
pub trait ICursorStore: Send + Sync {
    /// Loads the last saved context, or `None` on a first run
    async fn load(&self) -> anyhow::Result<Option<SyncContext>>;

    /// Saves the context, replacing any previous value
    async fn save(&self, context: &SyncContext) -> anyhow::Result<()>;
}
