//! Shared test helpers for Drive API integration tests
//!
//! Each helper mounts the endpoints a test needs on a wiremock server and
//! returns clients pointing at it.

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use picsync_drive::client::DriveClient;
use picsync_drive::provider::DriveRemoteStore;

pub const TEST_TOKEN: &str = "test-access-token";

/// Starts a mock server and returns it with a store pointing at it.
pub async fn setup_drive_mock() -> (MockServer, DriveRemoteStore) {
    let server = MockServer::start().await;
    let store = DriveRemoteStore::new(DriveClient::with_base_url(TEST_TOKEN, server.uri()));
    (server, store)
}

/// JSON for one image file resource
pub fn image_json(id: &str, name: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "mimeType": "image/jpeg",
        "modifiedTime": "2026-10-05T10:00:00.000Z",
        "parents": ["root_folder"],
        "trashed": false
    })
}

/// `count` image files named `img_<offset + i>.jpg`
pub fn image_batch(offset: usize, count: usize) -> Vec<serde_json::Value> {
    (offset..offset + count)
        .map(|i| image_json(&format!("file_{i}"), &format!("img_{i}.jpg")))
        .collect()
}

/// Mounts `GET /files/{id}?alt=media` returning `content`.
pub async fn mount_download(server: &MockServer, id: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{id}")))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(server)
        .await;
}

/// Mounts `GET /files/root?fields=id`.
pub async fn mount_root(server: &MockServer, root_id: &str) {
    Mock::given(method("GET"))
        .and(path("/files/root"))
        .and(query_param("fields", "id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": root_id
        })))
        .mount(server)
        .await;
}
