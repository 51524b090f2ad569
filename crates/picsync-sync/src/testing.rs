//! Test doubles shared by the engine, paginator, backup and scheduler tests

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};

use picsync_core::domain::{
    FileName, ListQuery, RemoteFileDescriptor, RemoteId, FOLDER_MIME_TYPE,
};
use picsync_core::ports::{IClock, IRemoteStore, ListPage, ProgressFn, RemoteError};

pub(crate) const ROOT: &str = "root_folder";

pub(crate) fn rid(id: &str) -> RemoteId {
    RemoteId::new(id.to_string()).unwrap()
}

pub(crate) fn ts(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

/// A JPEG descriptor living directly under [`ROOT`]
pub(crate) fn image(id: &str, name: &str, modified: DateTime<Utc>) -> RemoteFileDescriptor {
    RemoteFileDescriptor::new(
        rid(id),
        FileName::new(name.to_string()).unwrap(),
        "image/jpeg",
        modified,
    )
    .with_parents([rid(ROOT)])
}

pub(crate) fn folder(id: &str, name: &str) -> RemoteFileDescriptor {
    RemoteFileDescriptor::new(
        rid(id),
        FileName::new(name.to_string()).unwrap(),
        FOLDER_MIME_TYPE,
        ts(2026, 1, 1, 0),
    )
    .with_parents([rid(ROOT)])
}

/// Recorded `update_parents` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParentUpdate {
    pub file_id: String,
    pub add: String,
    pub remove: Vec<String>,
}

#[derive(Default)]
struct FakeState {
    files: Vec<RemoteFileDescriptor>,
    folders: Vec<RemoteFileDescriptor>,
    list_calls: Vec<ListQuery>,
    downloads: Vec<String>,
    parent_updates: Vec<ParentUpdate>,
    created: Vec<String>,
}

/// In-memory remote store
///
/// File listings are served in pages of the requested size using the
/// offset as continuation token; queries with a `name` are answered from
/// the folder list instead. Failures are injected per page, per file name
/// or per file id. `list_delay` stalls the first page of every file
/// listing, and `list_delays[n]` overrides it for the n-th listing; under a
/// paused tokio clock that only advances virtual time.
#[derive(Default)]
pub(crate) struct FakeRemoteStore {
    state: Mutex<FakeState>,
    pub fail_list_page: Option<u32>,
    pub unauthorized: bool,
    pub fail_downloads: HashSet<String>,
    pub unauthorized_downloads: HashSet<String>,
    pub fail_updates: HashSet<String>,
    pub fail_folder_lookup: bool,
    pub fail_create: bool,
    pub empty_final_token: bool,
    pub list_delay: Option<Duration>,
    pub list_delays: Vec<Duration>,
    list_started: Mutex<Vec<tokio::time::Instant>>,
}

impl FakeRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(files: impl IntoIterator<Item = RemoteFileDescriptor>) -> Self {
        let store = Self::new();
        store.state.lock().unwrap().files.extend(files);
        store
    }

    pub fn add_file(&self, file: RemoteFileDescriptor) {
        self.state.lock().unwrap().files.push(file);
    }

    pub fn add_folder(&self, folder: RemoteFileDescriptor) {
        self.state.lock().unwrap().folders.push(folder);
    }

    pub fn list_calls(&self) -> Vec<ListQuery> {
        self.state.lock().unwrap().list_calls.clone()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.state.lock().unwrap().downloads.clone()
    }

    pub fn parent_updates(&self) -> Vec<ParentUpdate> {
        self.state.lock().unwrap().parent_updates.clone()
    }

    /// Instants at which file listings (not folder lookups) started
    pub fn list_started(&self) -> Vec<tokio::time::Instant> {
        self.list_started.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    fn find_file(&self, id: &RemoteId) -> Option<RemoteFileDescriptor> {
        self.state
            .lock()
            .unwrap()
            .files
            .iter()
            .find(|f| f.id() == id)
            .cloned()
    }
}

fn matches(file: &RemoteFileDescriptor, container: &RemoteId, query: &ListQuery) -> bool {
    file.parent_ids().contains(container)
        && (query.mime_types.is_empty() || query.mime_types.iter().any(|m| m == file.mime_type()))
        && (query.include_trashed || !file.is_trashed())
        && query
            .modified_since
            .map_or(true, |since| file.modified_time() >= since)
}

#[async_trait::async_trait]
impl IRemoteStore for FakeRemoteStore {
    async fn list(
        &self,
        container_id: &RemoteId,
        query: &ListQuery,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<ListPage> {
        if self.unauthorized {
            return Err(RemoteError::Unauthorized("Invalid Credentials".to_string()).into());
        }

        if query.name.is_none() && page_token.is_none() {
            let delay = {
                let mut started = self.list_started.lock().unwrap();
                started.push(tokio::time::Instant::now());
                self.list_delays
                    .get(started.len() - 1)
                    .copied()
                    .or(self.list_delay)
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
        }

        let mut state = self.state.lock().unwrap();
        state.list_calls.push(query.clone());

        if let Some(name) = &query.name {
            if self.fail_folder_lookup {
                return Err(anyhow!("Server error (503): backend unavailable"));
            }
            let entries = state
                .folders
                .iter()
                .filter(|f| f.name().as_str() == name && matches(f, container_id, query))
                .cloned()
                .collect();
            return Ok(ListPage {
                entries,
                next_page_token: None,
            });
        }

        let offset: usize = page_token.map_or(0, |t| t.parse().unwrap());
        let size = page_size as usize;
        let page_number = (offset / size) as u32 + 1;
        if self.fail_list_page == Some(page_number) {
            return Err(anyhow!("Network error: connection reset by peer"));
        }

        let matching: Vec<_> = state
            .files
            .iter()
            .filter(|f| matches(f, container_id, query))
            .cloned()
            .collect();
        let end = (offset + size).min(matching.len());
        let entries = matching[offset.min(end)..end].to_vec();
        let next_page_token = if end < matching.len() {
            Some(end.to_string())
        } else if self.empty_final_token {
            Some(String::new())
        } else {
            None
        };

        Ok(ListPage {
            entries,
            next_page_token,
        })
    }

    async fn download(&self, file_id: &RemoteId, progress: Option<ProgressFn>) -> Result<Vec<u8>> {
        let file = self
            .find_file(file_id)
            .ok_or_else(|| anyhow!("Not found: {file_id}"))?;
        if self.fail_downloads.contains(file.name().as_str()) {
            return Err(anyhow!("Server error (500): download of {} failed", file.name()));
        }
        if self.unauthorized_downloads.contains(file.name().as_str()) {
            return Err(anyhow::Error::new(RemoteError::Unauthorized(
                "Invalid Credentials".to_string(),
            ))
            .context(format!("download of {}", file.name())));
        }
        self.state
            .lock()
            .unwrap()
            .downloads
            .push(file.name().to_string());

        let content = format!("content of {}", file.name()).into_bytes();
        if let Some(progress) = progress {
            progress(content.len() as u64, Some(content.len() as u64));
        }
        Ok(content)
    }

    async fn update_parents(
        &self,
        file_id: &RemoteId,
        add: &RemoteId,
        remove: &[RemoteId],
    ) -> Result<RemoteFileDescriptor> {
        if self.fail_updates.contains(file_id.as_str()) {
            return Err(anyhow!("Forbidden: insufficient permissions for {file_id}"));
        }
        let file = self
            .find_file(file_id)
            .ok_or_else(|| anyhow!("Not found: {file_id}"))?;
        self.state.lock().unwrap().parent_updates.push(ParentUpdate {
            file_id: file_id.to_string(),
            add: add.to_string(),
            remove: remove.iter().map(ToString::to_string).collect(),
        });
        Ok(file.with_parents([add.clone()]))
    }

    async fn create_container(&self, name: &str, parent_id: &RemoteId) -> Result<RemoteFileDescriptor> {
        if self.fail_create {
            return Err(anyhow!("Forbidden: storage quota exceeded"));
        }
        let mut state = self.state.lock().unwrap();
        let id = format!("folder_{name}");
        let created = RemoteFileDescriptor::new(
            rid(&id),
            FileName::new(name.to_string())?,
            FOLDER_MIME_TYPE,
            ts(2026, 1, 1, 0),
        )
        .with_parents([parent_id.clone()]);
        state.created.push(name.to_string());
        state.folders.push(created.clone());
        Ok(created)
    }

    async fn root_id(&self) -> Result<RemoteId> {
        Ok(rid(ROOT))
    }
}

/// Clock returning a settable instant
pub(crate) struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }
}

impl IClock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}
