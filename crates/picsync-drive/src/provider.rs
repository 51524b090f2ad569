//! DriveRemoteStore - IRemoteStore implementation for Google Drive v3
//!
//! Wraps the [`DriveClient`] and the query renderer to fulfil the
//! [`IRemoteStore`] port contract.
//!
//! ## Design Notes
//!
//! - Uses `tokio::sync::Mutex` because `IRemoteStore` methods take `&self`
//!   while `DriveClient::set_access_token` requires `&mut self`.
//! - Interactive authentication lives in [`crate::auth`]. A store built by
//!   [`crate::auth::connect`] carries an [`AuthSession`] and refreshes the
//!   access token before any request made close to its expiry.
//! - Every error leaving the port goes through [`classify`], which tags
//!   HTTP 401 responses with [`RemoteError::Unauthorized`].
//! - Listing entries that cannot be represented locally (an empty name, a
//!   name with a path separator) are dropped with a warning instead of
//!   failing the whole page.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use picsync_core::domain::{FileName, ListQuery, RemoteFileDescriptor, RemoteId};
use picsync_core::ports::{IRemoteStore, ListPage, ProgressFn, RemoteError};

use crate::auth::AuthSession;
use crate::client::{DriveClient, DriveFile};
use crate::query;
use crate::DriveError;

/// Converts a [`DriveFile`] into a port-level [`RemoteFileDescriptor`]
///
/// Parent ids that fail validation are dropped; a missing modification time
/// maps to the Unix epoch.
fn drive_file_to_descriptor(file: DriveFile) -> Result<RemoteFileDescriptor> {
    let id = RemoteId::new(file.id.clone())
        .with_context(|| format!("Invalid file id '{}'", file.id))?;
    let name = FileName::new(file.name.clone())
        .with_context(|| format!("Invalid file name '{}' for {}", file.name, file.id))?;
    let parents = file
        .parents
        .into_iter()
        .filter_map(|p| RemoteId::new(p).ok());

    Ok(RemoteFileDescriptor::new(
        id,
        name,
        file.mime_type,
        file.modified_time.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
    )
    .with_parents(parents)
    .with_trashed(file.trashed))
}

/// Tags a rejected-credentials failure with the port-level marker
///
/// Errors already carrying the marker, and every other failure, are
/// returned unchanged.
fn classify(err: anyhow::Error) -> anyhow::Error {
    if RemoteError::is_unauthorized(&err) {
        return err;
    }
    let rejected = err.chain().any(|cause| {
        cause
            .downcast_ref::<DriveError>()
            .is_some_and(DriveError::is_unauthorized)
    });
    if rejected {
        anyhow::Error::new(RemoteError::Unauthorized(format!("{err:#}")))
    } else {
        err
    }
}

/// Google Drive implementation of [`IRemoteStore`]
pub struct DriveRemoteStore {
    client: Mutex<DriveClient>,
    session: Option<Mutex<AuthSession>>,
}

impl DriveRemoteStore {
    /// Creates a store backed by the given client
    pub fn new(client: DriveClient) -> Self {
        Self {
            client: Mutex::new(client),
            session: None,
        }
    }

    /// Creates a store whose token is renewed through `session`
    pub fn with_session(client: DriveClient, session: AuthSession) -> Self {
        Self {
            client: Mutex::new(client),
            session: Some(Mutex::new(session)),
        }
    }

    /// Creates a store for the public Drive endpoint
    pub fn with_access_token(access_token: impl Into<String>) -> Self {
        Self::new(DriveClient::new(access_token))
    }

    /// Swaps the access token used by subsequent requests
    pub async fn set_access_token(&self, token: impl Into<String>) {
        self.client.lock().await.set_access_token(token);
    }

    /// Locks the client, refreshing its token first when a session is attached
    async fn authorized_client(&self) -> Result<MutexGuard<'_, DriveClient>> {
        let mut client = self.client.lock().await;
        if let Some(session) = &self.session {
            if let Some(token) = session.lock().await.refresh_if_needed().await? {
                client.set_access_token(token);
            }
        }
        Ok(client)
    }
}

#[async_trait::async_trait]
impl IRemoteStore for DriveRemoteStore {
    #[tracing::instrument(skip(self, query), fields(container = %container_id))]
    async fn list(
        &self,
        container_id: &RemoteId,
        query: &ListQuery,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<ListPage> {
        let q = query::render(container_id, query);
        let page = self
            .authorized_client()
            .await
            .map_err(classify)?
            .list_files(&q, page_size, page_token)
            .await
            .map_err(classify)?;

        let mut entries = Vec::with_capacity(page.files.len());
        for file in page.files {
            let file_id = file.id.clone();
            match drive_file_to_descriptor(file) {
                Ok(descriptor) => entries.push(descriptor),
                Err(e) => warn!(file_id = %file_id, error = %e, "Skipping unusable listing entry"),
            }
        }

        Ok(ListPage {
            entries,
            next_page_token: page.next_page_token,
        })
    }

    async fn download(&self, file_id: &RemoteId, progress: Option<ProgressFn>) -> Result<Vec<u8>> {
        self.authorized_client()
            .await
            .map_err(classify)?
            .download_file(file_id.as_str(), progress.as_ref())
            .await
            .map_err(classify)
    }

    async fn update_parents(
        &self,
        file_id: &RemoteId,
        add: &RemoteId,
        remove: &[RemoteId],
    ) -> Result<RemoteFileDescriptor> {
        let remove: Vec<String> = remove.iter().map(|r| r.as_str().to_string()).collect();
        let file = self
            .authorized_client()
            .await
            .map_err(classify)?
            .update_parents(file_id.as_str(), add.as_str(), &remove)
            .await
            .map_err(classify)?;
        debug!(file_id = %file_id, backup = %add, "Reparented file");
        drive_file_to_descriptor(file)
    }

    async fn create_container(&self, name: &str, parent_id: &RemoteId) -> Result<RemoteFileDescriptor> {
        let file = self
            .authorized_client()
            .await
            .map_err(classify)?
            .create_folder(name, parent_id.as_str())
            .await
            .map_err(classify)?;
        debug!(folder_id = %file.id, name, "Created folder");
        drive_file_to_descriptor(file)
    }

    async fn root_id(&self) -> Result<RemoteId> {
        let id = self
            .authorized_client()
            .await
            .map_err(classify)?
            .get_root_id()
            .await
            .map_err(classify)?;
        RemoteId::new(id).context("Drive returned an invalid root id")
    }
}
