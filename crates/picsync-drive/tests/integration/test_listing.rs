//! Integration tests for paginated listing and query rendering

use chrono::{TimeZone, Utc};
use picsync_core::domain::{ListQuery, RemoteId};
use picsync_core::ports::IRemoteStore;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

fn root() -> RemoteId {
    RemoteId::new("root_folder".to_string()).unwrap()
}

#[tokio::test]
async fn test_list_sends_rendered_query_and_page_size() {
    let (server, store) = common::setup_drive_mock().await;

    let since = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(header("authorization", "Bearer test-access-token"))
        .and(query_param(
            "q",
            "'root_folder' in parents and (mimeType = 'image/jpeg' or mimeType = 'image/png') \
             and trashed = false and modifiedTime >= '2026-10-01T00:00:00Z'",
        ))
        .and(query_param("pageSize", "10"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": common::image_batch(0, 2)
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = ListQuery::new()
        .with_mime_types(["image/jpeg", "image/png"])
        .with_modified_since(since);
    let page = store.list(&root(), &query, 10, None).await.unwrap();

    assert_eq!(page.entries.len(), 2);
    assert_eq!(page.entries[0].name().as_str(), "img_0.jpg");
    assert_eq!(page.entries[1].id().as_str(), "file_1");
    assert!(page.continuation().is_none());
}

#[tokio::test]
async fn test_list_forwards_page_token() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": common::image_batch(0, 10),
            "nextPageToken": "page-2"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": common::image_batch(10, 5)
        })))
        .mount(&server)
        .await;

    let query = ListQuery::new().with_mime_types(["image/jpeg"]);
    let first = store.list(&root(), &query, 10, None).await.unwrap();
    assert_eq!(first.entries.len(), 10);
    assert_eq!(first.continuation(), Some("page-2"));

    let second = store
        .list(&root(), &query, 10, first.continuation())
        .await
        .unwrap();
    assert_eq!(second.entries.len(), 5);
    assert_eq!(second.entries[0].name().as_str(), "img_10.jpg");
    assert!(second.continuation().is_none());
}

#[tokio::test]
async fn test_list_skips_entries_with_unusable_names() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [
                common::image_json("good", "good.jpg"),
                common::image_json("bad", "nested/bad.jpg"),
                common::image_json("dots", "..")
            ]
        })))
        .mount(&server)
        .await;

    let page = store
        .list(&root(), &ListQuery::new(), 10, None)
        .await
        .unwrap();
    assert_eq!(page.entries.len(), 1);
    assert_eq!(page.entries[0].id().as_str(), "good");
}

#[tokio::test]
async fn test_list_maps_unauthorized_status() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "code": 401, "message": "Invalid Credentials" }
        })))
        .mount(&server)
        .await;

    let err = store
        .list(&root(), &ListQuery::new(), 10, None)
        .await
        .unwrap_err();

    let drive_err = err
        .downcast_ref::<picsync_drive::DriveError>()
        .expect("error should carry a DriveError");
    assert!(drive_err.is_unauthorized());
    assert!(format!("{err:#}").contains("Invalid Credentials"));
}

#[tokio::test]
async fn test_list_maps_server_error_as_transient() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
        .mount(&server)
        .await;

    let err = store
        .list(&root(), &ListQuery::new(), 10, None)
        .await
        .unwrap_err();
    let drive_err = err.downcast_ref::<picsync_drive::DriveError>().unwrap();
    assert!(drive_err.is_transient());
}

#[tokio::test]
async fn test_root_id_lookup() {
    let (server, store) = common::setup_drive_mock().await;
    common::mount_root(&server, "0AFakeRootId").await;

    let root = store.root_id().await.unwrap();
    assert_eq!(root.as_str(), "0AFakeRootId");
}
