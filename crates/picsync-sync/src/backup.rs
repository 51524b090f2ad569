//! Backup container resolution
//!
//! Processed files are moved into a container named after the month of the
//! cycle (`yyyyMM`, UTC) directly under the configured root. The resolver
//! looks the container up by exact name and creates it when none exists.
//! When several containers share the name, the first one listed wins.
//!
//! A lookup that fails is an error: creating a container after a failed
//! lookup could duplicate one that already exists.

use anyhow::Context;
use picsync_core::domain::{BackupContainer, BackupPeriod, ListQuery, RemoteId};
use picsync_core::ports::IRemoteStore;
use tracing::{debug, info, instrument};

use crate::paginator::ListingPaginator;

/// Finds or creates the dated backup container under a root
pub struct BackupResolver<'a> {
    store: &'a dyn IRemoteStore,
    root: &'a RemoteId,
    page_size: u32,
}

impl<'a> BackupResolver<'a> {
    pub fn new(store: &'a dyn IRemoteStore, root: &'a RemoteId, page_size: u32) -> Self {
        Self {
            store,
            root,
            page_size,
        }
    }

    /// Returns the container for `period`, creating it when missing
    #[instrument(skip(self), fields(root = %self.root, period = %period))]
    pub async fn resolve(&self, period: BackupPeriod) -> anyhow::Result<BackupContainer> {
        let name = period.container_name();
        let query = ListQuery::containers_named(name.clone());

        let listing = ListingPaginator::new(self.store, self.page_size)
            .list_all(self.root, &query)
            .await;

        if let Some(existing) = listing.entries.into_iter().find(|e| e.is_container()) {
            debug!(container_id = %existing.id(), "Found existing backup container");
            return Ok(BackupContainer::new(period, existing.id().clone()));
        }

        if let Some(failure) = listing.failure {
            return Err(failure
                .error
                .context(format!("Failed to look up backup container '{name}'")));
        }

        let created = self
            .store
            .create_container(&name, self.root)
            .await
            .with_context(|| format!("Failed to create backup container '{name}'"))?;
        info!(container_id = %created.id(), name = %name, "Created backup container");

        Ok(BackupContainer::new(period, created.id().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{folder, rid, FakeRemoteStore, ROOT};

    fn october() -> BackupPeriod {
        BackupPeriod::new(2026, 10).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_existing_container() {
        let store = FakeRemoteStore::new();
        store.add_folder(folder("existing_202610", "202610"));
        let root = rid(ROOT);

        let container = BackupResolver::new(&store, &root, 10)
            .resolve(october())
            .await
            .unwrap();

        assert_eq!(container.id.as_str(), "existing_202610");
        assert_eq!(container.period, october());
        assert!(store.created().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_first_match_wins() {
        let store = FakeRemoteStore::new();
        store.add_folder(folder("first", "202610"));
        store.add_folder(folder("second", "202610"));
        let root = rid(ROOT);

        let container = BackupResolver::new(&store, &root, 10)
            .resolve(october())
            .await
            .unwrap();

        assert_eq!(container.id.as_str(), "first");
    }

    #[tokio::test]
    async fn test_resolve_creates_missing_container() {
        let store = FakeRemoteStore::new();
        store.add_folder(folder("other_month", "202609"));
        let root = rid(ROOT);

        let container = BackupResolver::new(&store, &root, 10)
            .resolve(october())
            .await
            .unwrap();

        assert_eq!(container.id.as_str(), "folder_202610");
        assert_eq!(store.created(), vec!["202610".to_string()]);

        let query = &store.list_calls()[0];
        assert_eq!(query.name.as_deref(), Some("202610"));
        assert!(!query.include_trashed);
    }

    #[tokio::test]
    async fn test_failed_lookup_does_not_create() {
        let mut store = FakeRemoteStore::new();
        store.fail_folder_lookup = true;
        let root = rid(ROOT);

        let err = BackupResolver::new(&store, &root, 10)
            .resolve(october())
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("Failed to look up backup container '202610'"));
        assert!(store.created().is_empty());
    }

    #[tokio::test]
    async fn test_failed_creation_is_reported() {
        let mut store = FakeRemoteStore::new();
        store.fail_create = true;
        let root = rid(ROOT);

        let err = BackupResolver::new(&store, &root, 10)
            .resolve(october())
            .await
            .unwrap_err();

        let message = format!("{err:#}");
        assert!(message.contains("Failed to create backup container"));
        assert!(message.contains("quota"));
    }
}
