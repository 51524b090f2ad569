//! Remote store port (driven/secondary port)
//!
//! This module defines the interface for the hierarchical cloud store the
//! images are pulled from. The shipped implementation targets Google Drive
//! v3, but nothing in the trait is Drive-specific.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   and don't need domain-level classification.
//! - Uses `#[async_trait]` for async trait methods.
//! - Listing is page-at-a-time; exhausting the pages is the job of the
//!   paginator in the sync crate, not of the adapter.
//! - The one failure callers must tell apart, rejected credentials, is
//!   tagged with [`RemoteError`] somewhere in the `anyhow` chain. Callers
//!   test for it with [`RemoteError::is_unauthorized`], never by message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ListQuery, RemoteFileDescriptor, RemoteId};

// ============================================================================
// Tokens
// ============================================================================

/// OAuth tokens received from the remote store's identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tokens {
    /// Bearer token for authenticating API requests
    pub access_token: String,
    /// Token for refreshing the access token without user interaction
    /// (requires offline access)
    pub refresh_token: Option<String>,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    /// Returns true if the access token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns true if the access token will expire within the given duration
    pub fn expires_within(&self, duration: chrono::Duration) -> bool {
        Utc::now() + duration >= self.expires_at
    }
}

// ============================================================================
// RemoteError
// ============================================================================

/// Classified remote failures carried inside `anyhow::Error`
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The store rejected the credentials; retrying with them cannot succeed
    #[error("Remote store rejected the credentials: {0}")]
    Unauthorized(String),
}

impl RemoteError {
    /// Returns true if `err` or any of its causes is [`RemoteError::Unauthorized`]
    pub fn is_unauthorized(err: &anyhow::Error) -> bool {
        err.chain().any(|cause| {
            matches!(
                cause.downcast_ref::<RemoteError>(),
                Some(RemoteError::Unauthorized(_))
            )
        })
    }
}

// ============================================================================
// ListPage
// ============================================================================

/// One page of a listing call
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Entries on this page, in the order the remote returned them
    pub entries: Vec<RemoteFileDescriptor>,
    /// Continuation token; `None` or an empty string ends the listing
    pub next_page_token: Option<String>,
}

impl ListPage {
    /// Continuation token, normalized so an empty string counts as absent
    pub fn continuation(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Download progress callback: `(bytes_received, total_bytes_if_known)`
///
/// Used for observability only.
pub type ProgressFn = Box<dyn Fn(u64, Option<u64>) + Send + Sync>;

// ============================================================================
// IRemoteStore trait
// ============================================================================

/// Port trait for the remote hierarchical file store
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Lists one page of the entries of `container_id` matching `query`
    ///
    /// # Arguments
    /// * `container_id` - Container whose direct children are listed
    /// * `query` - Server-side filter
    /// * `page_size` - Maximum number of entries on the page
    /// * `page_token` - Continuation token from the previous page
    async fn list(
        &self,
        container_id: &RemoteId,
        query: &ListQuery,
        page_size: u32,
        page_token: Option<&str>,
    ) -> anyhow::Result<ListPage>;

    /// Fetches the full content of a file
    async fn download(
        &self,
        file_id: &RemoteId,
        progress: Option<ProgressFn>,
    ) -> anyhow::Result<Vec<u8>>;

    /// Reparents a file in a single update: adds `add` and removes every
    /// container in `remove`
    async fn update_parents(
        &self,
        file_id: &RemoteId,
        add: &RemoteId,
        remove: &[RemoteId],
    ) -> anyhow::Result<RemoteFileDescriptor>;

    /// Creates a container named `name` under `parent_id`
    async fn create_container(
        &self,
        name: &str,
        parent_id: &RemoteId,
    ) -> anyhow::Result<RemoteFileDescriptor>;

    /// Resolves the concrete id of the user's root container
    async fn root_id(&self) -> anyhow::Result<RemoteId>;
}
