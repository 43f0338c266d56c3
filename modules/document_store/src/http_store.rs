// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{RemoteDocumentStore, StoreError};
use async_trait::async_trait;
use common::tracked_position::TrackedPosition;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

/// A document store reached over HTTP.
///
/// Documents live at `<base_url>/<collection>/<key>`. An upsert is a `PUT`
/// with the JSON document as body, a delete is a `DELETE`. A `404` on delete
/// counts as success.
pub struct HttpDocumentStore {
    client: Client,
    base_url: Url,
    collection: String,
}

impl HttpDocumentStore {
    pub fn new(base_url: &str, collection: &str) -> Result<Self, StoreError> {
        let base_url =
            Url::parse(base_url).map_err(|e| StoreError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl(base_url.to_string()));
        }
        Ok(HttpDocumentStore {
            client: Client::new(),
            base_url,
            collection: collection.to_owned(),
        })
    }

    /// URL of the document stored at `key`. Segments are percent encoded.
    pub fn document_url(&self, key: &str) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(&self.collection)
            .push(key);
        Ok(url)
    }
}

#[async_trait]
impl RemoteDocumentStore for HttpDocumentStore {
    async fn upsert(&self, key: &str, document: &TrackedPosition) -> Result<(), StoreError> {
        let url = self.document_url(key)?;
        let response = self.client.put(url.clone()).json(document).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Rejected {
                status: status.as_u16(),
            });
        }
        debug!("PUT {} -> {}", url, status);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let url = self.document_url(key)?;
        let response = self.client.delete(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(StoreError::Rejected {
                status: status.as_u16(),
            });
        }
        debug!("DELETE {} -> {}", url, status);
        Ok(())
    }
}
