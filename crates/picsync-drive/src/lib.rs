//! picsync Drive - Google Drive v3 API client
//!
//! Provides async client for:
//! - OAuth2 authentication (installed-app Authorization Code with PKCE)
//! - Paginated file listing with server-side query filters
//! - Streamed media download with progress reporting
//! - Folder creation and single-call reparenting
//!
//! ## Modules
//!
//! - [`auth`] - OAuth2 PKCE authentication flow components
//! - [`client`] - Drive v3 HTTP client
//! - [`query`] - Rendering of listing filters into the Drive query language
//! - [`provider`] - [`IRemoteStore`](picsync_core::ports::IRemoteStore) adapter

pub mod auth;
pub mod client;
pub mod provider;
pub mod query;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when communicating with the Google Drive API
#[derive(Debug, Error)]
pub enum DriveError {
    /// Authentication credentials are invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions, or a quota was exceeded
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested file or folder does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded
    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    /// A server-side error occurred (5xx)
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Any other non-success status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl DriveError {
    /// Classifies a non-success HTTP status and its response body
    pub fn from_status(status: StatusCode, body: impl Into<String>) -> Self {
        let message = body.into();
        match status {
            StatusCode::UNAUTHORIZED => DriveError::Unauthorized(message),
            StatusCode::FORBIDDEN => DriveError::Forbidden(message),
            StatusCode::NOT_FOUND => DriveError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => DriveError::TooManyRequests(message),
            s if s.is_server_error() => DriveError::ServerError {
                status: s.as_u16(),
                message,
            },
            s => DriveError::UnexpectedStatus {
                status: s.as_u16(),
                message,
            },
        }
    }

    /// Returns true if a later attempt may succeed without user action
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DriveError::TooManyRequests(_)
                | DriveError::ServerError { .. }
                | DriveError::NetworkError(_)
        )
    }

    /// Returns true if the credentials must be renewed
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, DriveError::Unauthorized(_))
    }
}
