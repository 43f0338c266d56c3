// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{Event, EventBus, EventKind, EventKindType};
use tokio::time::{Instant, timeout, timeout_at};
use tracing::debug;

/// Publishes [`EventKind::QuitEvent`] and waits up to 100 ms for the module
/// task behind `handle` to return `Ok`.
///
/// # Panics
/// Panics when the module keeps running, panicked or returned an error.
pub async fn stop_module(
    event_bus: &EventBus,
    handle: &mut tokio::task::JoinHandle<Result<(), ()>>,
) {
    event_bus.publish(&Event {
        kind: EventKind::QuitEvent,
    });
    timeout(std::time::Duration::from_millis(100), handle)
        .await
        .expect("Module doesn't handle quit event in timeout")
        .expect("Module task panicked")
        .expect("Module returned an error");
}

/// Waits for the first [`Event`] on `rx` that satisfies `predicate`.
///
/// Events that don't match are skipped.
///
/// # Panics
///
/// Panics if no matching event is received within `duration`.
pub async fn wait_for<F>(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
    duration: std::time::Duration,
    predicate: F,
) -> Event
where
    F: Fn(&EventKind) -> bool,
{
    let deadline = Instant::now() + duration;
    loop {
        match timeout_at(deadline, rx.recv()).await {
            Ok(Ok(event)) if predicate(&event.kind) => return event,
            Ok(Ok(event)) => debug!("Skipping event {:?}", event.event_type()),
            Ok(Err(e)) => debug!("Receive error while waiting for event: {}", e),
            Err(_) => panic!("No matching event received within {:?}", duration),
        }
    }
}

/// Like [`wait_for`] but only compares the variant of the event.
pub async fn wait_for_event(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
    duration: std::time::Duration,
    exp_event: EventKindType,
) -> Event {
    wait_for(rx, duration, |kind| EventKindType::from(kind) == exp_event).await
}

/// Drains every event currently buffered in `rx` without waiting.
pub fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(tokio::sync::broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => return events,
        }
    }
}
