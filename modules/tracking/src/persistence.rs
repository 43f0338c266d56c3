// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use async_trait::async_trait;
use common::tracking_state::TrackingState;
use std::{
    fs::DirBuilder,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, error, info};

/// Namespace the tracking state is stored under.
pub const STATE_NAMESPACE: &str = "localization_prefs";

/// Loads and saves the [`TrackingState`].
#[async_trait]
pub trait TrackingStatePersistence: Send + Sync {
    /// Returns the stored state or the inactive default if nothing was stored yet.
    async fn load(&self) -> io::Result<TrackingState>;

    async fn save(&self, state: &TrackingState) -> io::Result<()>;
}

/// Stores the tracking state as JSON file `<root_dir>/localization_prefs.json`.
pub struct FileTrackingStatePersistence {
    file_path: PathBuf,
}

impl FileTrackingStatePersistence {
    pub fn new(root_dir: &Path) -> Self {
        if let Err(e) = DirBuilder::new().recursive(true).create(root_dir) {
            error!(
                "Failed to create state dir {}. Error: {}",
                root_dir.to_string_lossy(),
                e
            );
        }
        let mut file_path = root_dir.to_path_buf();
        file_path.push(format!("{STATE_NAMESPACE}.json"));
        info!("Using tracking state file: {}", file_path.to_string_lossy());
        FileTrackingStatePersistence { file_path }
    }
}

#[async_trait]
impl TrackingStatePersistence for FileTrackingStatePersistence {
    async fn load(&self) -> io::Result<TrackingState> {
        let mut file = match tokio::fs::File::open(&self.file_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No tracking state stored yet");
                return Ok(TrackingState::default());
            }
            Err(e) => return Err(e),
        };
        let mut json = String::default();
        file.read_to_string(&mut json).await?;
        TrackingState::from_json(&json).map_err(|e| io::Error::new(ErrorKind::InvalidData, e))
    }

    async fn save(&self, state: &TrackingState) -> io::Result<()> {
        let json = state.to_json()?;
        let mut file = tokio::fs::File::create(&self.file_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        Ok(())
    }
}

/// Keeps the tracking state in memory.
#[derive(Default)]
pub struct MemoryTrackingStatePersistence {
    state: Mutex<TrackingState>,
    saves: AtomicUsize,
}

impl MemoryTrackingStatePersistence {
    pub fn with_state(state: TrackingState) -> Self {
        MemoryTrackingStatePersistence {
            state: Mutex::new(state),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> TrackingState {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackingStatePersistence for MemoryTrackingStatePersistence {
    async fn load(&self) -> io::Result<TrackingState> {
        Ok(self.state())
    }

    async fn save(&self, state: &TrackingState) -> io::Result<()> {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
