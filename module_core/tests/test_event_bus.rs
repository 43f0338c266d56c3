// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::sync::SyncState;
use module_core::{
    test_helper::{drain_events, wait_for, wait_for_event},
    *,
};
use std::{sync::Arc, time::Duration};

#[tokio::test]
#[test_log::test]
pub async fn events_delivered() {
    let event_bus = EventBus::new();
    let mut receiver = event_bus.subscribe();
    let event = Event {
        kind: EventKind::QuitEvent,
    };
    event_bus.publish(&event);
    let received_event = tokio::time::timeout(Duration::from_millis(100), receiver.recv())
        .await
        .expect("Failed to receive event in required time")
        .unwrap();
    assert_eq!(received_event.event_type(), event.event_type());
}

#[tokio::test]
#[test_log::test]
pub async fn context_publishes_to_other_modules() {
    let event_bus = EventBus::new();
    let ctx = event_bus.context();
    let mut rx = event_bus.subscribe();
    ctx.publish_event(EventKind::StartTrackingRequestEvent(Arc::new(
        "Alice".to_owned(),
    )))
    .expect("Failed to publish request");

    let event = wait_for_event(
        &mut rx,
        Duration::from_millis(100),
        EventKindType::StartTrackingRequestEvent,
    )
    .await;
    let name = payload_ref!(event.kind, EventKind::StartTrackingRequestEvent).unwrap();
    assert_eq!(name.as_str(), "Alice");
}

#[tokio::test]
#[test_log::test]
pub async fn wait_for_skips_non_matching_payloads() {
    let event_bus = EventBus::new();
    let mut rx = event_bus.subscribe();
    for state in [SyncState::Starting, SyncState::Active] {
        event_bus.publish(&Event {
            kind: EventKind::SyncStateChangedEvent(state),
        });
    }

    let event = wait_for(&mut rx, Duration::from_millis(100), |kind| {
        *kind == EventKind::SyncStateChangedEvent(SyncState::Active)
    })
    .await;
    assert_eq!(event.kind, EventKind::SyncStateChangedEvent(SyncState::Active));
    assert!(drain_events(&mut rx).is_empty());
}
