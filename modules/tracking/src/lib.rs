// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Tracking Modul for the tracker
//!
//! Owns the user's start/stop intent and the persisted tracking state. This
//! is the only module that begins or ends the location sync.

use async_trait::async_trait;
use common::{
    identity::DeviceIdentity,
    permission::{PermissionGate, TRACKING_PERMISSIONS},
    sync::BeginRejection,
    tracking_state::{TrackingState, TrackingStatus},
};
use module_core::{BeginSync, EventKind, Module, ModuleCtx};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub mod persistence;

use persistence::TrackingStatePersistence;

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("display name must not be empty")]
    EmptyDisplayName,
    #[error("location permissions not granted")]
    PermissionDenied,
    #[error("tracking already active for {0}")]
    AlreadyTracking(String),
    #[error("failed to persist tracking state: {0}")]
    Persistence(#[from] std::io::Error),
}

/// Drives tracking between `Offline` and `Online`.
///
/// `start` validates the display name, makes sure all location permissions
/// are granted, persists the state and begins the location sync. `stop`
/// ends the sync and persists the inactive state.
///
/// The state restored at startup only affects the presented status. An
/// `Online` state restored after a restart does not begin the location sync
/// again.
pub struct TrackingController {
    ctx: ModuleCtx,
    identity: DeviceIdentity,
    persistence: Arc<dyn TrackingStatePersistence>,
    permissions: Arc<dyn PermissionGate>,
    status: TrackingStatus,
}

impl TrackingController {
    pub fn new(
        ctx: ModuleCtx,
        identity: DeviceIdentity,
        persistence: Arc<dyn TrackingStatePersistence>,
        permissions: Arc<dyn PermissionGate>,
    ) -> Self {
        TrackingController {
            ctx,
            identity,
            persistence,
            permissions,
            status: TrackingStatus::Offline,
        }
    }

    pub fn status(&self) -> &TrackingStatus {
        &self.status
    }

    /// Restores the presented status from the persisted state.
    pub async fn restore(&mut self) -> Result<&TrackingStatus, TrackingError> {
        let state = self.persistence.load().await?;
        let status = TrackingStatus::from(&state);
        if let TrackingStatus::Online(name) = &status {
            warn!(
                "Restored tracking state is online for {}, location sync is not running",
                name
            );
        }
        self.set_status(status);
        Ok(&self.status)
    }

    pub async fn start(&mut self, display_name: &str) -> Result<(), TrackingError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            self.notify_user("Enter your name before starting.");
            return Err(TrackingError::EmptyDisplayName);
        }
        if let TrackingStatus::Online(name) = &self.status {
            return Err(TrackingError::AlreadyTracking(name.clone()));
        }
        if !self.permissions.tracking_authorized() {
            info!("Location permissions missing, requesting them");
            if !self.permissions.request(&TRACKING_PERMISSIONS).await {
                self.notify_user("Location permissions are required.");
                return Err(TrackingError::PermissionDenied);
            }
        }

        if let Err(e) = self
            .persistence
            .save(&TrackingState::active(display_name))
            .await
        {
            error!("Failed to persist tracking state. Error: {}", e);
            self.notify_user("Tracking could not be started.");
            return Err(e.into());
        }
        let _ = self
            .ctx
            .publish_event(EventKind::BeginSyncEvent(Arc::new(BeginSync {
                identity: self.identity.clone(),
                display_name: Some(display_name.to_owned()),
            })));
        info!("Tracking started for {}", display_name);
        self.set_status(TrackingStatus::Online(display_name.to_owned()));
        self.notify_user(&format!("Tracking started for {display_name}"));
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), TrackingError> {
        if self.status == TrackingStatus::Offline {
            debug!("Tracking already stopped");
            return Ok(());
        }
        let _ = self.ctx.publish_event(EventKind::EndSyncEvent);
        let saved = self.persistence.save(&TrackingState::inactive()).await;
        info!("Tracking stopped");
        self.set_status(TrackingStatus::Offline);
        self.notify_user("Tracking stopped");
        Ok(saved?)
    }

    async fn on_begin_rejected(&mut self, reason: BeginRejection) {
        match reason {
            BeginRejection::PermissionDenied => {
                if !self.status.is_online() {
                    return;
                }
                warn!("Location sync refused to begin, location permission revoked");
                if let Err(e) = self.persistence.save(&TrackingState::inactive()).await {
                    error!("Failed to persist tracking state. Error: {}", e);
                }
                self.set_status(TrackingStatus::Offline);
                self.notify_user("Location permissions are required.");
            }
            BeginRejection::NotStopped => {
                warn!("Location sync is already running");
            }
        }
    }

    fn set_status(&mut self, status: TrackingStatus) {
        debug!("Tracking status: {}", status.label());
        self.status = status;
        let _ = self
            .ctx
            .publish_event(EventKind::TrackingStatusEvent(Arc::new(self.status.clone())));
    }

    fn notify_user(&self, message: &str) {
        let _ = self
            .ctx
            .publish_event(EventKind::UserMessageEvent(Arc::new(message.to_owned())));
    }
}

#[async_trait]
impl Module for TrackingController {
    async fn run(&mut self) -> std::result::Result<(), ()> {
        let mut run = true;
        while run {
            match self.ctx.receiver.recv().await {
                Ok(event) => match event.kind {
                    EventKind::QuitEvent => run = false,
                    EventKind::StartTrackingRequestEvent(name) => {
                        if let Err(e) = self.start(&name).await {
                            warn!("Failed to start tracking. Error: {e}");
                        }
                    }
                    EventKind::StopTrackingRequestEvent => {
                        if let Err(e) = self.stop().await {
                            error!("Failed to stop tracking. Error: {e}");
                        }
                    }
                    EventKind::BeginSyncRejectedEvent(reason) => {
                        self.on_begin_rejected(reason).await;
                    }
                    _ => (),
                },
                Err(e) => {
                    error!("Failed to receive event in module TrackingController. Error:{e}");
                }
            }
        }
        Ok(())
    }
}
