// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Location sync Modul for the tracker
//!
//! Reports the position of the device into its document of the remote store
//! while tracking is active and removes the document when tracking ends.

use async_trait::async_trait;
use common::{
    identity::DeviceIdentity,
    permission::PermissionGate,
    position::LocationSample,
    sync::{BeginRejection, SyncState},
    tracked_position::TrackedPosition,
};
use document_store::RemoteDocumentStore;
use futures::future::join_all;
use location::{LocationSource, LocationUpdate, Subscription};
use module_core::{BeginSync, EventKind, Module, ModuleCtx};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::mpsc,
    time::{Interval, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

/// Interval of the fallback loop that re-reads the last known position.
pub const FALLBACK_INTERVAL: Duration = Duration::from_secs(5);

/// Display name used when a begin request carries none.
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown";

pub const NOTICE_TITLE: &str = "Tracking active";
pub const NOTICE_BODY: &str = "Sending coordinates to the server…";

const UPDATE_CHANNEL_CAPACITY: usize = 32;

#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub fallback_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            fallback_interval: FALLBACK_INTERVAL,
        }
    }
}

/// A remote write waiting for the store writer.
enum StoreCommand {
    Upsert {
        key: String,
        document: TrackedPosition,
    },
    Delete {
        key: String,
    },
}

/// Everything owned while the service is `Active`.
struct ActiveSync {
    identity: DeviceIdentity,
    display_name: String,
    /// Subscriptions together with the index of their source.
    subscriptions: Vec<(usize, Subscription)>,
}

/// Keeps the remote document of this device up to date while tracking is active.
///
/// The service reacts to [`EventKind::BeginSyncEvent`] and [`EventKind::EndSyncEvent`].
/// While `Active` every position delivered by any subscribed source is
/// upserted immediately, and a fallback timer upserts the last known position
/// of the most accurate source that has one. Remote writes are fire and
/// forget: results are only logged. They are queued to a single writer task,
/// so the store sees them in the order they were issued and the delete of an
/// `end` is always the last call of its session.
///
/// When the service is dropped while active it ends itself, so the document
/// delete is issued on teardown as well. Completion of that delete is not
/// guaranteed.
pub struct LocationSyncService {
    ctx: ModuleCtx,
    sources: Vec<Arc<dyn LocationSource>>,
    store: Arc<dyn RemoteDocumentStore>,
    permissions: Arc<dyn PermissionGate>,
    config: SyncConfig,
    state: SyncState,
    active: Option<ActiveSync>,
    /// Receives the updates of the current session only.
    updates_rx: Option<mpsc::Receiver<LocationUpdate>>,
    ticker: Option<Interval>,
    writer: Option<mpsc::UnboundedSender<StoreCommand>>,
}

impl LocationSyncService {
    pub fn new(
        ctx: ModuleCtx,
        mut sources: Vec<Arc<dyn LocationSource>>,
        store: Arc<dyn RemoteDocumentStore>,
        permissions: Arc<dyn PermissionGate>,
        config: SyncConfig,
    ) -> Self {
        // Last known positions are read in this order.
        sources.sort_by_key(|source| source.kind());
        LocationSyncService {
            ctx,
            sources,
            store,
            permissions,
            config,
            state: SyncState::Stopped,
            active: None,
            updates_rx: None,
            ticker: None,
            writer: None,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    fn set_state(&mut self, state: SyncState) {
        debug!("Location sync state {:?} -> {:?}", self.state, state);
        self.state = state;
        let _ = self
            .ctx
            .publish_event(EventKind::SyncStateChangedEvent(state));
    }

    fn reject(&self, reason: BeginRejection) {
        let _ = self
            .ctx
            .publish_event(EventKind::BeginSyncRejectedEvent(reason));
    }

    async fn begin(&mut self, request: &BeginSync) {
        if self.state != SyncState::Stopped {
            warn!("Begin ignored, location sync is {:?}", self.state);
            self.reject(BeginRejection::NotStopped);
            return;
        }
        self.set_state(SyncState::Starting);
        if !self.permissions.location_readable() {
            warn!("Location permission not granted, location sync not started");
            self.set_state(SyncState::Stopped);
            self.reject(BeginRejection::PermissionDenied);
            return;
        }

        let (updates_tx, updates_rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        let results = join_all(
            self.sources
                .iter()
                .map(|source| source.subscribe(updates_tx.clone())),
        )
        .await;
        self.updates_rx = Some(updates_rx);
        let mut subscriptions = Vec::new();
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(subscription) => {
                    debug!("Subscribed to location source {}", self.sources[index].name());
                    subscriptions.push((index, subscription));
                }
                Err(e) => error!(
                    "Failed to subscribe to location source {}. Error: {}",
                    self.sources[index].name(),
                    e
                ),
            }
        }

        // The first tick completes immediately.
        let mut ticker = tokio::time::interval(self.config.fallback_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(ticker);
        self.start_writer();

        let display_name = request
            .display_name
            .clone()
            .unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_owned());
        info!(
            "Location sync started for {} on {} of {} sources",
            display_name,
            subscriptions.len(),
            self.sources.len()
        );
        info!("{}: {}", NOTICE_TITLE, NOTICE_BODY);
        self.active = Some(ActiveSync {
            identity: request.identity.clone(),
            display_name,
            subscriptions,
        });
        self.set_state(SyncState::Active);
    }

    fn end(&mut self) {
        let Some(active) = self.active.take() else {
            debug!("End ignored, location sync is {:?}", self.state);
            return;
        };
        for (index, subscription) in active.subscriptions {
            debug!("Unsubscribing from {}", subscription.source_name());
            self.sources[index].unsubscribe(subscription);
        }
        self.ticker = None;
        // Closes the channel, updates still in flight from aborted deliveries are dropped.
        self.updates_rx = None;
        self.set_state(SyncState::Stopping);

        self.send_to_store(StoreCommand::Delete {
            key: active.identity.to_string(),
        });
        info!("Location sync stopped");
        self.set_state(SyncState::Stopped);
    }

    fn on_location_update(&mut self, update: LocationUpdate) {
        if self.state != SyncState::Active {
            debug!("Dropping location update received while {:?}", self.state);
            return;
        }
        debug!("Location update from {:?} source", update.source);
        self.submit(update.sample);
    }

    async fn on_fallback_tick(&mut self) {
        if self.state != SyncState::Active {
            return;
        }
        if !self.permissions.location_readable() {
            debug!("Location permission revoked, skipping fallback tick");
            return;
        }
        let sources = self.sources.clone();
        for source in sources.iter() {
            if let Some(sample) = source.last_known().await {
                debug!("Fallback tick uses last known position of {}", source.name());
                self.submit(sample);
                return;
            }
        }
        debug!("No last known position available, skipping fallback tick");
    }

    /// Sends `sample` to the remote store without waiting for the result.
    fn submit(&self, sample: LocationSample) {
        let Some(active) = &self.active else {
            return;
        };
        self.send_to_store(StoreCommand::Upsert {
            key: active.identity.to_string(),
            document: TrackedPosition::now(&active.display_name, sample),
        });
    }

    /// Spawns the store writer unless one is still running. The writer lives
    /// as long as the service so that calls of consecutive sessions stay ordered.
    fn start_writer(&mut self) {
        if self.writer.as_ref().is_some_and(|writer| !writer.is_closed()) {
            return;
        }
        let (writer, commands) = mpsc::unbounded_channel();
        tokio::spawn(run_store_writer(self.store.clone(), commands));
        self.writer = Some(writer);
    }

    fn send_to_store(&self, command: StoreCommand) {
        let Some(writer) = &self.writer else {
            error!("No store writer running, remote call dropped");
            return;
        };
        if writer.send(command).is_err() {
            error!("Store writer stopped, remote call dropped");
        }
    }
}

/// Performs the queued remote calls one after another and logs their outcome.
async fn run_store_writer(
    store: Arc<dyn RemoteDocumentStore>,
    mut commands: mpsc::UnboundedReceiver<StoreCommand>,
) {
    while let Some(command) = commands.recv().await {
        let (operation, key, result) = match command {
            StoreCommand::Upsert { key, document } => {
                let result = store.upsert(&key, &document).await;
                ("upsert", key, result)
            }
            StoreCommand::Delete { key } => {
                let result = store.delete(&key).await;
                ("delete", key, result)
            }
        };
        match result {
            Ok(()) => info!("Remote {} of document {} succeeded", operation, key),
            Err(e) => error!(
                "Remote {} of document {} failed. Error: {}",
                operation, key, e
            ),
        }
    }
    debug!("Store writer finished");
}

async fn next_update(
    updates: &mut Option<mpsc::Receiver<LocationUpdate>>,
) -> Option<LocationUpdate> {
    match updates {
        Some(updates) => updates.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[async_trait]
impl Module for LocationSyncService {
    async fn run(&mut self) -> Result<(), ()> {
        let mut run = true;
        while run {
            tokio::select! {
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) => match event.kind {
                            EventKind::QuitEvent => {
                                self.end();
                                run = false;
                            }
                            EventKind::BeginSyncEvent(request) => self.begin(&request).await,
                            EventKind::EndSyncEvent => self.end(),
                            _ => (),
                        },
                        Err(e) => {
                            error!("Failed to receive event in module LocationSyncService. Error:{e}");
                        }
                    }
                }
                Some(update) = next_update(&mut self.updates_rx) => self.on_location_update(update),
                _ = next_tick(&mut self.ticker) => self.on_fallback_tick().await,
            }
        }
        Ok(())
    }
}

impl Drop for LocationSyncService {
    fn drop(&mut self) {
        if self.active.is_some() {
            warn!("Location sync dropped while active, ending it");
            self.end();
        }
    }
}
