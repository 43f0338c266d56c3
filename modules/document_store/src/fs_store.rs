// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{RemoteDocumentStore, StoreError};
use async_trait::async_trait;
use common::tracked_position::TrackedPosition;
use std::{
    fs::DirBuilder,
    io,
    path::{Path, PathBuf},
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, error, info};

/// A file system based document store.
///
/// Every document is stored as `<root_dir>/<collection>/<key>.json`.
///
/// ## Important
///
/// `FileSystemDocumentStore` **does not implement any internal synchronization or locking mechanisms**.
/// Concurrent writes to the same key are resolved by whichever write reaches the file system last.
pub struct FileSystemDocumentStore {
    collection_dir: PathBuf,
}

impl FileSystemDocumentStore {
    pub fn new(root_dir: &Path, collection: &str) -> Self {
        let mut collection_dir = root_dir.to_path_buf();
        collection_dir.push(collection);
        if let Err(e) = DirBuilder::new().recursive(true).create(&collection_dir) {
            error!(
                "Failed to create collection dir {}. Error: {}",
                collection_dir.to_string_lossy(),
                e
            );
        }
        info!(
            "Using document storage folder: {}",
            collection_dir.to_string_lossy()
        );
        FileSystemDocumentStore { collection_dir }
    }

    /// Loads the document stored at `key`, `None` if there is none.
    pub async fn load(&self, key: &str) -> Result<Option<TrackedPosition>, StoreError> {
        let file_path = self.document_path(key)?;
        let mut file = match tokio::fs::File::open(&file_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut json = String::default();
        file.read_to_string(&mut json).await?;
        Ok(Some(TrackedPosition::from_json(&json)?))
    }

    fn document_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
            return Err(StoreError::InvalidKey(key.to_owned()));
        }
        let mut file_path = self.collection_dir.clone();
        file_path.push(format!("{key}.json"));
        Ok(file_path)
    }

    /// Writes `data` to `path`, creating or truncating the file, and syncs it to disk.
    async fn save_bytes(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut file = tokio::fs::File::create(path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteDocumentStore for FileSystemDocumentStore {
    async fn upsert(&self, key: &str, document: &TrackedPosition) -> Result<(), StoreError> {
        let file_path = self.document_path(key)?;
        let json = document.to_json()?;
        self.save_bytes(&file_path, json.as_bytes()).await?;
        debug!("Stored document {}", file_path.to_string_lossy());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let file_path = self.document_path(key)?;
        match tokio::fs::remove_file(&file_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Document {} already absent", file_path.to_string_lossy());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
