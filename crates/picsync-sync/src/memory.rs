//! Process-local cursor store
//!
//! Used when `sync.persist_cursor` is off: the context survives between
//! cycles but not across restarts.

use picsync_core::domain::SyncContext;
use picsync_core::ports::ICursorStore;
use tokio::sync::RwLock;

/// [`ICursorStore`] keeping the last saved context in memory
#[derive(Debug, Default)]
pub struct InMemoryCursorStore {
    context: RwLock<Option<SyncContext>>,
}

impl InMemoryCursorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ICursorStore for InMemoryCursorStore {
    async fn load(&self) -> anyhow::Result<Option<SyncContext>> {
        Ok(self.context.read().await.clone())
    }

    async fn save(&self, context: &SyncContext) -> anyhow::Result<()> {
        *self.context.write().await = Some(context.clone());
        Ok(())
    }
}
