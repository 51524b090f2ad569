//! Integration tests for picsync-drive
//!
//! Uses wiremock to simulate the Google Drive v3 API and verifies
//! end-to-end behavior of the DriveClient and the DriveRemoteStore.

mod common;

mod test_backup_ops;
mod test_download;
mod test_listing;
