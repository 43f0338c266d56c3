// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use chrono::{SubsecRound, Utc};
use common::{position::LocationSample, tracked_position::TrackedPosition};
use document_store::{RemoteDocumentStore, StoreError, fs_store::FileSystemDocumentStore};
use std::path::PathBuf;

fn setup_empty_test_folder(test_folder_name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push("tracker_fs_store_tests");
    path.push(test_folder_name);
    if path.exists() {
        std::fs::remove_dir_all(&path).unwrap_or_else(|e| {
            panic!(
                "Failed to clean test folder {}. Error: {e}",
                path.to_string_lossy()
            )
        });
    }
    path
}

fn document(name: &str, latitude: f64, longitude: f64) -> TrackedPosition {
    TrackedPosition::new(
        name,
        LocationSample::new(latitude, longitude),
        Utc::now().trunc_subsecs(3),
    )
}

#[tokio::test]
#[test_log::test]
pub async fn upsert_creates_document_in_collection_folder() {
    let root = setup_empty_test_folder("upsert_creates_document");
    let store = FileSystemDocumentStore::new(&root, "ambulances");
    let doc = document("Alice", 10.0, 20.0);

    store.upsert("Pixel_7_ABC", &doc).await.unwrap();

    let mut expected_file = root.clone();
    expected_file.push("ambulances");
    expected_file.push("Pixel_7_ABC.json");
    assert!(expected_file.exists());
    assert_eq!(store.load("Pixel_7_ABC").await.unwrap(), Some(doc));
}

#[tokio::test]
#[test_log::test]
pub async fn upsert_replaces_whole_document() {
    let root = setup_empty_test_folder("upsert_replaces_document");
    let store = FileSystemDocumentStore::new(&root, "ambulances");
    store
        .upsert("device", &document("Alice", 1.0, 1.0))
        .await
        .unwrap();
    let newer = document("Bob", 2.0, 3.0);
    store.upsert("device", &newer).await.unwrap();

    assert_eq!(store.load("device").await.unwrap(), Some(newer));
}

#[tokio::test]
#[test_log::test]
pub async fn delete_removes_document_and_ignores_absent() {
    let root = setup_empty_test_folder("delete_removes_document");
    let store = FileSystemDocumentStore::new(&root, "ambulances");
    store
        .upsert("device", &document("Alice", 1.0, 1.0))
        .await
        .unwrap();

    store.delete("device").await.unwrap();
    assert_eq!(store.load("device").await.unwrap(), None);
    store.delete("device").await.unwrap();
}

#[tokio::test]
pub async fn reject_key_that_escapes_collection() {
    let root = setup_empty_test_folder("reject_key");
    let store = FileSystemDocumentStore::new(&root, "ambulances");
    let result = store.upsert("../other", &document("Alice", 1.0, 1.0)).await;
    assert!(matches!(result, Err(StoreError::InvalidKey(_))));
}
