// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Event bus and module runtime shared by every module of the tracker.

use common::{
    identity::DeviceIdentity,
    sync::{BeginRejection, SyncState},
    tracking_state::TrackingStatus,
};
use std::sync::Arc;
use strum_macros::EnumDiscriminants;
use tokio::sync::broadcast::error::SendError;

/// A message travelling over the [`EventBus`] between the tracker modules.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub kind: EventKind,
}

impl Event {
    /// Returns the discriminant of the carried [`EventKind`].
    pub fn event_type(&self) -> EventKindType {
        EventKindType::from(&self.kind)
    }
}

/// Parameters to begin syncing the device position.
#[derive(Clone, Debug, PartialEq)]
pub struct BeginSync {
    /// Key of the remote document.
    pub identity: DeviceIdentity,
    /// Name shown next to the position. `None` falls back to a sentinel.
    pub display_name: Option<String>,
}

pub type BeginSyncPtr = Arc<BeginSync>;
pub type DisplayNamePtr = Arc<String>;
pub type TrackingStatusPtr = Arc<TrackingStatus>;
pub type UserMessagePtr = Arc<String>;

/// Requests, notifications and state changes exchanged by the modules.
///
/// Payloads that are not `Copy` are shared behind an [`Arc`] so that every
/// subscriber gets a cheap clone.
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(EventKindType), derive(Hash))]
pub enum EventKind {
    /// Indicates that a module shall terminate.
    QuitEvent,

    /// The user asks to start tracking under the given display name.
    StartTrackingRequestEvent(DisplayNamePtr),

    /// The user asks to stop tracking.
    StopTrackingRequestEvent,

    /// Presentation state of the tracking controller changed.
    TrackingStatusEvent(TrackingStatusPtr),

    /// A message that shall be shown to the user.
    UserMessageEvent(UserMessagePtr),

    /// Instructs the sync service to start reporting positions.
    BeginSyncEvent(BeginSyncPtr),

    /// Instructs the sync service to stop reporting and clean up.
    EndSyncEvent,

    /// The sync service entered a new state.
    SyncStateChangedEvent(SyncState),

    /// The sync service refused a [`EventKind::BeginSyncEvent`].
    BeginSyncRejectedEvent(BeginRejection),
}

/// Returns a reference to the payload of `$kind` if it is the variant `$variant`.
///
/// ```
/// use module_core::{EventKind, payload_ref};
/// use std::sync::Arc;
///
/// let kind = EventKind::UserMessageEvent(Arc::new("hello".to_owned()));
/// assert_eq!(payload_ref!(kind, EventKind::UserMessageEvent).unwrap().as_str(), "hello");
/// ```
#[macro_export]
macro_rules! payload_ref {
    ($kind:expr, $variant:path) => {
        match &$kind {
            $variant(payload) => Some(payload),
            _ => None,
        }
    };
}

/// Broadcast channel connecting the tracker modules.
///
/// Every subscriber sees every event published after it subscribed. Events
/// published while nobody listens are lost.
pub struct EventBus {
    sender: tokio::sync::broadcast::Sender<Event>,
}

impl EventBus {
    /// Bus buffering up to 100 events per subscriber. A subscriber that falls
    /// further behind loses the oldest events.
    pub fn new() -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(100);
        EventBus { sender }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: &Event) {
        let _ = self.sender.send(event.clone());
    }

    pub fn context(&self) -> ModuleCtx {
        ModuleCtx::new(self)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A long running part of the tracker driven by bus events.
#[async_trait::async_trait]
pub trait Module {
    /// Handles events until [`EventKind::QuitEvent`] arrives.
    async fn run(&mut self) -> Result<(), ()>;
}

/// The bus endpoints owned by one module: a sender for its own events and a
/// receiver subscribed when the context was created.
pub struct ModuleCtx {
    pub sender: tokio::sync::broadcast::Sender<Event>,
    pub receiver: tokio::sync::broadcast::Receiver<Event>,
}

impl ModuleCtx {
    pub fn new(event_bus: &EventBus) -> Self {
        ModuleCtx {
            sender: event_bus.sender.clone(),
            receiver: event_bus.subscribe(),
        }
    }

    /// Wraps `kind` into an [`Event`] and publishes it on the bus.
    ///
    /// Returns the number of receivers the event was delivered to.
    pub fn publish_event(&self, kind: EventKind) -> Result<usize, SendError<Event>> {
        self.sender.send(Event { kind })
    }
}

pub mod test_helper;
