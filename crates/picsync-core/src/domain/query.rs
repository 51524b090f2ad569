//! Provider-neutral listing filter
//!
//! [`ListQuery`] describes the server-side filter of a listing call. Parent
//! membership is not part of it: the container is passed separately to
//! `IRemoteStore::list`, and each adapter renders the combination in its own
//! query language.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::descriptor::FOLDER_MIME_TYPE;

/// Filter evaluated by the remote store when listing a container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    /// Allowed MIME types (empty means any type)
    pub mime_types: Vec<String>,
    /// Lower bound (inclusive) on the modification time
    pub modified_since: Option<DateTime<Utc>>,
    /// Exact name match
    pub name: Option<String>,
    /// Include trashed entries
    pub include_trashed: bool,
}

impl ListQuery {
    /// Query matching any non-trashed entry
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to the given MIME types
    pub fn with_mime_types<I, S>(mut self, mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mime_types = mime_types.into_iter().map(Into::into).collect();
        self
    }

    /// Only entries modified at or after `since`
    pub fn with_modified_since(mut self, since: DateTime<Utc>) -> Self {
        self.modified_since = Some(since);
        self
    }

    /// Only entries with exactly this name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Query for containers named `name`
    pub fn containers_named(name: impl Into<String>) -> Self {
        Self::new()
            .with_mime_types([FOLDER_MIME_TYPE])
            .with_name(name)
    }
}
