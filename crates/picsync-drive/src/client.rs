//! Google Drive v3 API client
//!
//! Provides a typed HTTP client for the subset of the Drive v3 REST API
//! picsync needs. Handles authentication headers, JSON deserialization,
//! status classification, and endpoint construction.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use picsync_drive::client::DriveClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DriveClient::new("access-token-here");
//! let root = client.get_root_id().await?;
//! let page = client
//!     .list_files(&format!("'{root}' in parents and trashed = false"), 10, None)
//!     .await?;
//! println!("{} files", page.files.len());
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use picsync_core::{domain::FOLDER_MIME_TYPE, ports::ProgressFn};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::DriveError;

/// Base URL for the Google Drive v3 API
pub const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Partial-response field mask for a single file
const FILE_FIELDS: &str = "id,name,mimeType,modifiedTime,parents,trashed";

/// Partial-response field mask for a listing page
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType,modifiedTime,parents,trashed)";

// ============================================================================
// Drive API response types
// ============================================================================

/// A file resource as returned by the Drive API
///
/// Only the fields requested through the field masks are modeled.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub trashed: bool,
}

/// One page of `GET /files`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Body of `POST /files` when creating a folder
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateFolderRequest<'a> {
    name: &'a str,
    mime_type: &'a str,
    parents: [&'a str; 1],
}

/// Response of `GET /files/root?fields=id`
#[derive(Debug, Deserialize)]
struct FileIdResponse {
    id: String,
}

/// Google's JSON error envelope
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

// ============================================================================
// DriveClient
// ============================================================================

/// HTTP client for Google Drive v3 calls
///
/// Wraps `reqwest::Client` with authentication headers and base URL
/// construction for the Drive API.
pub struct DriveClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests
    base_url: String,
    /// Current OAuth2 access token
    access_token: String,
}

impl DriveClient {
    /// Creates a new DriveClient with the given access token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, DRIVE_BASE_URL)
    }

    /// Creates a new DriveClient with a custom base URL (useful for testing)
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            access_token: access_token.into(),
        }
    }

    /// Updates the access token (e.g., after a token refresh)
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
        debug!("Updated DriveClient access token");
    }

    /// Returns a reference to the current access token
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to base URL (e.g., "/files")
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.access_token)
    }

    /// Lists one page of files matching the query
    ///
    /// Makes `GET /files?q=..&pageSize=..&pageToken=..&fields=..`.
    ///
    /// # Arguments
    /// * `q` - Rendered Drive query (see [`crate::query::render`])
    /// * `page_size` - Maximum number of files on the page
    /// * `page_token` - Continuation token from the previous page
    pub async fn list_files(
        &self,
        q: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<FileList> {
        debug!(q, page_size, has_token = page_token.is_some(), "Listing files");

        let page_size = page_size.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("q", q),
            ("pageSize", page_size.as_str()),
            ("fields", LIST_FIELDS),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let response = self
            .request(Method::GET, "/files")
            .query(&params)
            .send()
            .await
            .context("Failed to send list request")?;

        let list: FileList = check_status(response)
            .await
            .context("GET /files returned error status")?
            .json()
            .await
            .context("Failed to parse file list response")?;

        debug!(
            count = list.files.len(),
            more = list.next_page_token.is_some(),
            "Listed files"
        );
        Ok(list)
    }

    /// Downloads the content of a file
    ///
    /// Makes `GET /files/{id}?alt=media` and reads the body as a stream,
    /// reporting progress after each chunk. The total is taken from
    /// `Content-Length` when the server sends one.
    pub async fn download_file(&self, id: &str, progress: Option<&ProgressFn>) -> Result<Vec<u8>> {
        let path = format!("/files/{}", id);
        debug!(file_id = id, "Downloading file");

        let response = self
            .request(Method::GET, &path)
            .query(&[("alt", "media")])
            .send()
            .await
            .context("Failed to send download request")?;

        let response = check_status(response)
            .await
            .context("Download request returned error status")?;

        let total = response.content_length();
        let mut buffer = Vec::with_capacity(total.unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Failed to read download response body")?;
            buffer.extend_from_slice(&chunk);
            debug!(
                file_id = id,
                received = buffer.len(),
                total = ?total,
                "Download is in progress"
            );
            if let Some(report) = progress {
                report(buffer.len() as u64, total);
            }
        }

        debug!(file_id = id, bytes = buffer.len(), "Download is Complete");
        Ok(buffer)
    }

    /// Moves a file between folders in a single update
    ///
    /// Makes `PATCH /files/{id}?addParents=..&removeParents=..` with an empty
    /// JSON body.
    pub async fn update_parents(&self, id: &str, add: &str, remove: &[String]) -> Result<DriveFile> {
        let path = format!("/files/{}", id);
        let remove = remove.join(",");
        debug!(file_id = id, add, remove = %remove, "Updating parents");

        let mut params: Vec<(&str, &str)> = vec![("addParents", add), ("fields", FILE_FIELDS)];
        if !remove.is_empty() {
            params.push(("removeParents", remove.as_str()));
        }

        let response = self
            .request(Method::PATCH, &path)
            .query(&params)
            .json(&serde_json::json!({}))
            .send()
            .await
            .context("Failed to send update request")?;

        let file: DriveFile = check_status(response)
            .await
            .context("PATCH /files returned error status")?
            .json()
            .await
            .context("Failed to parse update response")?;
        Ok(file)
    }

    /// Creates a folder under `parent`
    ///
    /// Makes `POST /files` with the folder MIME type.
    pub async fn create_folder(&self, name: &str, parent: &str) -> Result<DriveFile> {
        debug!(name, parent, "Creating folder");

        let body = CreateFolderRequest {
            name,
            mime_type: FOLDER_MIME_TYPE,
            parents: [parent],
        };

        let response = self
            .request(Method::POST, "/files")
            .query(&[("fields", FILE_FIELDS)])
            .json(&body)
            .send()
            .await
            .context("Failed to send create folder request")?;

        let file: DriveFile = check_status(response)
            .await
            .context("POST /files returned error status")?
            .json()
            .await
            .context("Failed to parse create folder response")?;
        Ok(file)
    }

    /// Resolves the concrete id of the user's root folder
    ///
    /// Makes `GET /files/root?fields=id`.
    pub async fn get_root_id(&self) -> Result<String> {
        let response = self
            .request(Method::GET, "/files/root")
            .query(&[("fields", "id")])
            .send()
            .await
            .context("Failed to send root lookup request")?;

        let root: FileIdResponse = check_status(response)
            .await
            .context("GET /files/root returned error status")?
            .json()
            .await
            .context("Failed to parse root lookup response")?;

        debug!(root_id = %root.id, "Resolved root folder id");
        Ok(root.id)
    }
}

/// Passes successful responses through and classifies the others
async fn check_status(response: Response) -> std::result::Result<Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DriveError::from_status(status, error_message(&body)))
}

/// Extracts `error.message` from a Google error body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
