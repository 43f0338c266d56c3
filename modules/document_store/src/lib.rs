// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Document store Modul for the tracker
//!
//! Provides the interface of the keyed remote document store and its implementations.

use async_trait::async_trait;
use common::tracked_position::TrackedPosition;

pub mod fs_store;
pub mod http_store;
pub mod test_helper;

/// Collection the tracked positions are stored in.
pub const DEFAULT_COLLECTION: &str = "ambulances";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to serialize document: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("http transport failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store rejected the request with status {status}")]
    Rejected { status: u16 },
    #[error("invalid store url: {0}")]
    InvalidUrl(String),
    #[error("invalid document key: {0:?}")]
    InvalidKey(String),
}

/// A keyed document store.
///
/// Every call completes independently. There is no transactional guarantee
/// across calls.
#[async_trait]
pub trait RemoteDocumentStore: Send + Sync {
    /// Replaces the document at `key` in full, creating it if absent.
    async fn upsert(&self, key: &str, document: &TrackedPosition) -> Result<(), StoreError>;

    /// Removes the document at `key`. Removing an absent document succeeds.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
