//! Remote file descriptors and local download records

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{FileName, RemoteId};

/// MIME type the remote store uses for containers (folders)
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Immutable snapshot of a remote entry at listing time
///
/// Only the attributes the sync cycle needs are modeled; any other metadata
/// the remote returns is ignored by the adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileDescriptor {
    id: RemoteId,
    name: FileName,
    mime_type: String,
    modified_time: DateTime<Utc>,
    parent_ids: BTreeSet<RemoteId>,
    trashed: bool,
}

impl RemoteFileDescriptor {
    pub fn new(
        id: RemoteId,
        name: FileName,
        mime_type: impl Into<String>,
        modified_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            mime_type: mime_type.into(),
            modified_time,
            parent_ids: BTreeSet::new(),
            trashed: false,
        }
    }

    /// Builder-style setter for the parent container set
    #[must_use]
    pub fn with_parents(mut self, parents: impl IntoIterator<Item = RemoteId>) -> Self {
        self.parent_ids = parents.into_iter().collect();
        self
    }

    /// Builder-style setter for the trashed flag
    #[must_use]
    pub fn with_trashed(mut self, trashed: bool) -> Self {
        self.trashed = trashed;
        self
    }

    pub fn id(&self) -> &RemoteId {
        &self.id
    }

    pub fn name(&self) -> &FileName {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn modified_time(&self) -> DateTime<Utc> {
        self.modified_time
    }

    pub fn parent_ids(&self) -> &BTreeSet<RemoteId> {
        &self.parent_ids
    }

    pub fn is_trashed(&self) -> bool {
        self.trashed
    }

    /// Returns true if this entry is a container rather than a file
    pub fn is_container(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Deterministic local path of this entry inside `download_dir`
    pub fn local_path_in(&self, download_dir: &Path) -> PathBuf {
        download_dir.join(&self.name)
    }
}

/// One completed local download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    /// Descriptor the content was fetched from
    pub source: RemoteFileDescriptor,
    /// Final location of the content on disk
    pub local_path: PathBuf,
    /// Number of bytes written
    pub bytes: u64,
}
