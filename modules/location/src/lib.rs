// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Location Modul for the tracker
//!
//! Provides the location source abstraction and the sources available on linux based systems.

use async_trait::async_trait;
use common::position::LocationSample;
use std::sync::{Arc, RwLock};
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::debug;

pub mod constant_source;
pub mod gpsd_source;
pub mod test_helper;

/// Precision class of a location source.
///
/// When reading last known positions, [`SourceKind::HighAccuracy`] sources are
/// asked before [`SourceKind::Coarse`] ones. Live updates are never prioritized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    /// Satellite based fixes.
    HighAccuracy,
    /// Network or otherwise approximated positions.
    Coarse,
}

/// A position delivered by a subscribed source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationUpdate {
    pub source: SourceKind,
    pub sample: LocationSample,
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("invalid source configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to subscribe to source {source_name}: {reason}")]
    Subscribe { source_name: String, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Handle of an active subscription.
///
/// The subscription delivers updates until it is cancelled. Dropping the
/// handle cancels the subscription as well.
#[derive(Debug)]
pub struct Subscription {
    source_name: String,
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn new(source_name: &str, handle: JoinHandle<()>) -> Self {
        Subscription {
            source_name: source_name.to_owned(),
            handle,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Stops the delivery of updates.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
        debug!("Subscription to {} cancelled", self.source_name);
    }
}

/// Common interface that every location source must support.
#[async_trait]
pub trait LocationSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    fn name(&self) -> &str;

    /// Starts delivering new positions to `consumer` until the returned
    /// [`Subscription`] is cancelled.
    async fn subscribe(&self, consumer: Sender<LocationUpdate>)
    -> Result<Subscription, SourceError>;

    /// The most recent position this source has seen, if any.
    async fn last_known(&self) -> Option<LocationSample>;

    fn unsubscribe(&self, subscription: Subscription) {
        subscription.cancel();
    }
}

/// The last known position of a source, shared with its delivery tasks.
#[derive(Clone, Debug, Default)]
pub struct LastKnown(Arc<RwLock<Option<LocationSample>>>);

impl LastKnown {
    pub fn get(&self) -> Option<LocationSample> {
        *self.0.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set(&self, sample: LocationSample) {
        *self.0.write().unwrap_or_else(|e| e.into_inner()) = Some(sample);
    }
}
