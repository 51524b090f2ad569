//! Integration tests for folder creation and reparenting

use picsync_core::domain::RemoteId;
use picsync_core::ports::IRemoteStore;
use wiremock::matchers::{body_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

fn id(value: &str) -> RemoteId {
    RemoteId::new(value.to_string()).unwrap()
}

#[tokio::test]
async fn test_create_container_posts_folder() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/files"))
        .and(body_json(serde_json::json!({
            "name": "202610",
            "mimeType": "application/vnd.google-apps.folder",
            "parents": ["root_folder"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "backup_202610",
            "name": "202610",
            "mimeType": "application/vnd.google-apps.folder",
            "parents": ["root_folder"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let folder = store
        .create_container("202610", &id("root_folder"))
        .await
        .unwrap();
    assert_eq!(folder.id().as_str(), "backup_202610");
    assert!(folder.is_container());
}

#[tokio::test]
async fn test_update_parents_adds_and_removes_in_one_call() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("PATCH"))
        .and(path("/files/file_1"))
        .and(query_param("addParents", "backup_202610"))
        .and(query_param("removeParents", "root_folder,other_parent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "file_1",
            "name": "a.jpg",
            "mimeType": "image/jpeg",
            "modifiedTime": "2026-10-05T10:00:00Z",
            "parents": ["backup_202610"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let moved = store
        .update_parents(
            &id("file_1"),
            &id("backup_202610"),
            &[id("root_folder"), id("other_parent")],
        )
        .await
        .unwrap();

    assert_eq!(moved.parent_ids().len(), 1);
    assert!(moved.parent_ids().contains(&id("backup_202610")));
}

#[tokio::test]
async fn test_update_parents_without_previous_parents() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("PATCH"))
        .and(path("/files/orphan"))
        .and(query_param("addParents", "backup_202610"))
        .and(query_param_is_missing("removeParents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "orphan",
            "name": "o.jpg",
            "parents": ["backup_202610"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    store
        .update_parents(&id("orphan"), &id("backup_202610"), &[])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_update_parents_forbidden() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("PATCH"))
        .and(path("/files/file_2"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": { "code": 403, "message": "Insufficient permissions" }
        })))
        .mount(&server)
        .await;

    let err = store
        .update_parents(&id("file_2"), &id("backup_202610"), &[id("root_folder")])
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<picsync_drive::DriveError>(),
        Some(picsync_drive::DriveError::Forbidden(_))
    ));
}
