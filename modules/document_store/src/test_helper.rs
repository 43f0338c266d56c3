// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{RemoteDocumentStore, StoreError};
use async_trait::async_trait;
use common::{test_helper::journal::Journal, tracked_position::TrackedPosition};
use std::sync::Mutex;

/// A call received by the [`RecordingDocumentStore`].
#[derive(Clone, Debug, PartialEq)]
pub enum StoreCall {
    Upsert { key: String, document: TrackedPosition },
    Delete { key: String },
}

/// A document store that records every call instead of persisting documents.
///
/// Calls are also written to the optional [`Journal`] as `upsert:<key>` and
/// `delete:<key>`. A failing store records the call and then rejects it.
#[derive(Default)]
pub struct RecordingDocumentStore {
    calls: Mutex<Vec<StoreCall>>,
    fail_writes: bool,
    journal: Journal,
}

impl RecordingDocumentStore {
    pub fn new() -> Self {
        RecordingDocumentStore::default()
    }

    pub fn failing() -> Self {
        RecordingDocumentStore {
            fail_writes: true,
            ..RecordingDocumentStore::default()
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Documents of all upsert calls in call order.
    pub fn upserts(&self) -> Vec<TrackedPosition> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::Upsert { document, .. } => Some(document),
                StoreCall::Delete { .. } => None,
            })
            .collect()
    }

    /// Keys of all delete calls in call order.
    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::Delete { key } => Some(key),
                StoreCall::Upsert { .. } => None,
            })
            .collect()
    }

    fn record(&self, call: StoreCall) -> Result<(), StoreError> {
        let entry = match &call {
            StoreCall::Upsert { key, .. } => format!("upsert:{key}"),
            StoreCall::Delete { key } => format!("delete:{key}"),
        };
        self.journal.record(entry);
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        if self.fail_writes {
            return Err(StoreError::Rejected { status: 503 });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteDocumentStore for RecordingDocumentStore {
    async fn upsert(&self, key: &str, document: &TrackedPosition) -> Result<(), StoreError> {
        self.record(StoreCall::Upsert {
            key: key.to_owned(),
            document: document.clone(),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.record(StoreCall::Delete {
            key: key.to_owned(),
        })
    }
}
