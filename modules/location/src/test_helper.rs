// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{LastKnown, LocationSource, LocationUpdate, SourceError, SourceKind, Subscription};
use async_trait::async_trait;
use common::{position::LocationSample, test_helper::journal::Journal};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{broadcast, mpsc::Sender};
use tracing::debug;

/// A location source that is driven by the test.
///
/// Positions are delivered to all subscribers when [`ManualLocationSource::emit`]
/// is called. Subscribe and unsubscribe calls are recorded in an optional
/// [`Journal`] as `subscribe:<name>` and `unsubscribe:<name>`.
pub struct ManualLocationSource {
    name: String,
    kind: SourceKind,
    sender: broadcast::Sender<LocationSample>,
    last_known: LastKnown,
    fail_subscribe: bool,
    active_subscriptions: AtomicUsize,
    journal: Journal,
}

impl ManualLocationSource {
    pub fn new(name: &str, kind: SourceKind) -> Self {
        let (sender, _) = broadcast::channel(16);
        ManualLocationSource {
            name: name.to_owned(),
            kind,
            sender,
            last_known: LastKnown::default(),
            fail_subscribe: false,
            active_subscriptions: AtomicUsize::new(0),
            journal: Journal::default(),
        }
    }

    /// A source whose subscribe call always fails.
    pub fn failing(name: &str, kind: SourceKind) -> Self {
        ManualLocationSource {
            fail_subscribe: true,
            ..ManualLocationSource::new(name, kind)
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    /// Reports a fresh fix to every subscriber and caches it as last known position.
    pub fn emit(&self, sample: LocationSample) {
        self.last_known.set(sample);
        if self.sender.send(sample).is_err() {
            debug!("No subscriber for {}", self.name);
        }
    }

    pub fn set_last_known(&self, sample: LocationSample) {
        self.last_known.set(sample);
    }

    pub fn active_subscriptions(&self) -> usize {
        self.active_subscriptions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationSource for ManualLocationSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn subscribe(
        &self,
        consumer: Sender<LocationUpdate>,
    ) -> Result<Subscription, SourceError> {
        if self.fail_subscribe {
            self.journal.record(format!("subscribe-failed:{}", self.name));
            return Err(SourceError::Subscribe {
                source_name: self.name.clone(),
                reason: "provider unavailable".to_owned(),
            });
        }
        let mut receiver = self.sender.subscribe();
        let kind = self.kind;
        let handle = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(sample) => {
                        let update = LocationUpdate {
                            source: kind,
                            sample,
                        };
                        if consumer.send(update).await.is_err() {
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });
        self.active_subscriptions.fetch_add(1, Ordering::SeqCst);
        self.journal.record(format!("subscribe:{}", self.name));
        Ok(Subscription::new(&self.name, handle))
    }

    async fn last_known(&self) -> Option<LocationSample> {
        self.last_known.get()
    }

    fn unsubscribe(&self, subscription: Subscription) {
        self.active_subscriptions.fetch_sub(1, Ordering::SeqCst);
        self.journal.record(format!("unsubscribe:{}", self.name));
        subscription.cancel();
    }
}
