//! Integration tests for media download

use std::sync::{Arc, Mutex};

use picsync_core::domain::RemoteId;
use picsync_core::ports::{IRemoteStore, ProgressFn, RemoteError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

fn id(value: &str) -> RemoteId {
    RemoteId::new(value.to_string()).unwrap()
}

#[tokio::test]
async fn test_download_file_returns_content() {
    let (server, store) = common::setup_drive_mock().await;

    let content = b"\xFF\xD8\xFF\xE0 not really a jpeg";
    common::mount_download(&server, "download_001", content).await;

    let data = store
        .download(&id("download_001"), None)
        .await
        .expect("Download failed");
    assert_eq!(data, content);
}

#[tokio::test]
async fn test_download_large_file_reports_progress() {
    let (server, store) = common::setup_drive_mock().await;

    let content: Vec<u8> = (0..1_048_576).map(|i| (i % 256) as u8).collect();
    common::mount_download(&server, "large_001", &content).await;

    let seen: Arc<Mutex<Vec<(u64, Option<u64>)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let progress: ProgressFn = Box::new(move |received, total| {
        sink.lock().unwrap().push((received, total));
    });

    let data = store
        .download(&id("large_001"), Some(progress))
        .await
        .expect("Large download failed");
    assert_eq!(data, content);

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    let (last_received, last_total) = *seen.last().unwrap();
    assert_eq!(last_received, 1_048_576);
    assert!(last_total.is_none() || last_total == Some(1_048_576));
    assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
}

#[tokio::test]
async fn test_download_empty_file() {
    let (server, store) = common::setup_drive_mock().await;
    common::mount_download(&server, "empty_001", &[]).await;

    let data = store.download(&id("empty_001"), None).await.unwrap();
    assert!(data.is_empty());
}

#[tokio::test]
async fn test_download_not_found() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files/missing_001"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": { "code": 404, "message": "File not found: missing_001." }
        })))
        .mount(&server)
        .await;

    let err = store.download(&id("missing_001"), None).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<picsync_drive::DriveError>(),
        Some(picsync_drive::DriveError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_download_rejected_credentials_are_tagged() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files/file_001"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "code": 401, "message": "Invalid Credentials" }
        })))
        .mount(&server)
        .await;

    let err = store.download(&id("file_001"), None).await.unwrap_err();
    assert!(RemoteError::is_unauthorized(&err));
}

#[tokio::test]
async fn test_download_server_error_on_401_named_id_is_not_unauthorized() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files/IMG_4010"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": { "code": 500, "message": "Backend Error" }
        })))
        .mount(&server)
        .await;

    let err = store.download(&id("IMG_4010"), None).await.unwrap_err();
    assert!(!RemoteError::is_unauthorized(&err));
    assert!(matches!(
        err.downcast_ref::<picsync_drive::DriveError>(),
        Some(picsync_drive::DriveError::ServerError { status: 500, .. })
    ));
}
