// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::{
    identity::DeviceIdentity, permission::StaticPermissionGate, position::LocationSample,
    sync::SyncState, tracking_state::TrackingState,
};
use document_store::test_helper::RecordingDocumentStore;
use location::{LocationSource, SourceKind, test_helper::ManualLocationSource};
use location_sync::{LocationSyncService, SyncConfig};
use module_core::{
    EventBus, EventKind, Module,
    test_helper::{stop_module, wait_for},
};
use std::{sync::Arc, time::Duration};
use tracking::{TrackingController, persistence::MemoryTrackingStatePersistence};

const DEVICE: &str = "Pixel 7_TQ3A";

#[tokio::test(start_paused = true)]
#[test_log::test]
async fn report_position_until_stopped() {
    let eb = EventBus::default();
    let mut rx = eb.subscribe();
    let source_a = Arc::new(ManualLocationSource::new("gps", SourceKind::HighAccuracy));
    let source_b = Arc::new(ManualLocationSource::new("network", SourceKind::Coarse));
    let store = Arc::new(RecordingDocumentStore::new());
    let permissions = Arc::new(StaticPermissionGate::granted());
    let persistence = Arc::new(MemoryTrackingStatePersistence::default());
    let mut service = LocationSyncService::new(
        eb.context(),
        vec![
            source_a.clone() as Arc<dyn LocationSource>,
            source_b.clone() as Arc<dyn LocationSource>,
        ],
        store.clone(),
        permissions.clone(),
        SyncConfig::default(),
    );
    let mut module = tokio::spawn(async move { service.run().await });
    let mut controller = TrackingController::new(
        eb.context(),
        DeviceIdentity::new(DEVICE),
        persistence.clone(),
        permissions,
    );
    let start = tokio::time::Instant::now();

    controller.start("Alice").await.unwrap();
    wait_for(&mut rx, Duration::from_millis(100), |kind| {
        *kind == EventKind::SyncStateChangedEvent(SyncState::Active)
    })
    .await;
    // The tick at begin finds no cached position on either source.
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(store.upserts().is_empty());
    source_a.emit(LocationSample::new(10.0, 20.0));

    tokio::time::sleep_until(start + Duration::from_millis(6000)).await;
    let upserts = store.upserts();
    assert_eq!(upserts.len(), 2);
    for upsert in &upserts {
        assert_eq!(upsert.display_name, "Alice");
        assert_eq!(upsert.position.latitude, 10.0);
        assert_eq!(upsert.position.longitude, 20.0);
    }

    controller.stop().await.unwrap();
    wait_for(&mut rx, Duration::from_millis(100), |kind| {
        *kind == EventKind::SyncStateChangedEvent(SyncState::Stopped)
    })
    .await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(store.deletes(), vec![DEVICE.to_owned()]);
    assert_eq!(store.upserts().len(), 2);
    assert_eq!(persistence.state(), TrackingState::inactive());
    stop_module(&eb, &mut module).await;
}
