//! Replay marker storage
//!
//! Keys are `"{key_prefix}:{channel}"`, where the prefix is
//! `"{configured_prefix}:{source_name}"` or just the source name.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use contracts::{ForwarderError, ReplayMarker, ReplayMarkerStorage, ReplayStorageConfig};
use tracing::{debug, error};

/// In-process storage, markers are lost on restart
#[derive(Debug, Default)]
pub struct MemoryReplayStorage {
    markers: Mutex<HashMap<String, ReplayMarker>>,
}

impl MemoryReplayStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, ReplayMarker>>, ForwarderError> {
        self.markers
            .lock()
            .map_err(|_| ForwarderError::replay_storage("marker map lock poisoned"))
    }
}

impl ReplayMarkerStorage for MemoryReplayStorage {
    async fn get_marker(&self, key: &str) -> Result<Option<ReplayMarker>, ForwarderError> {
        Ok(self.lock()?.get(key).copied())
    }

    async fn set_marker(&self, key: &str, marker: ReplayMarker) -> Result<(), ForwarderError> {
        self.lock()?.insert(key.to_string(), marker);
        Ok(())
    }
}

/// JSON object file `{ "<key>": <marker>, ... }`
///
/// The whole file is rewritten on every update. A missing file reads as empty.
#[derive(Debug)]
pub struct FileReplayStorage {
    path: PathBuf,
    cache: tokio::sync::Mutex<Option<BTreeMap<String, ReplayMarker>>>,
}

impl FileReplayStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: tokio::sync::Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, ReplayMarker>, ForwarderError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(ForwarderError::replay_storage(format!(
                    "failed to read '{}': {e}",
                    self.path.display()
                )))
            }
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            ForwarderError::replay_storage(format!(
                "corrupt marker file '{}': {e}",
                self.path.display()
            ))
        })
    }

    async fn persist(&self, markers: &BTreeMap<String, ReplayMarker>) -> Result<(), ForwarderError> {
        let content = serde_json::to_vec_pretty(markers)
            .map_err(|e| ForwarderError::replay_storage(format!("serialize error: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ForwarderError::replay_storage(format!(
                    "failed to create '{}': {e}",
                    parent.display()
                ))
            })?;
        }

        tokio::fs::write(&self.path, content).await.map_err(|e| {
            ForwarderError::replay_storage(format!(
                "failed to write '{}': {e}",
                self.path.display()
            ))
        })
    }
}

impl ReplayMarkerStorage for FileReplayStorage {
    async fn get_marker(&self, key: &str) -> Result<Option<ReplayMarker>, ForwarderError> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(self.load().await?);
        }
        Ok(cache.as_ref().and_then(|markers| markers.get(key).copied()))
    }

    async fn set_marker(&self, key: &str, marker: ReplayMarker) -> Result<(), ForwarderError> {
        let mut cache = self.cache.lock().await;
        let mut markers = match cache.take() {
            Some(markers) => markers,
            None => self.load().await?,
        };
        markers.insert(key.to_string(), marker);
        let result = self.persist(&markers).await;
        *cache = Some(markers);
        result
    }
}

/// Storage selected by configuration
#[derive(Debug)]
pub enum AnyReplayStorage {
    Memory(MemoryReplayStorage),
    File(FileReplayStorage),
}

impl AnyReplayStorage {
    pub fn from_config(config: &ReplayStorageConfig) -> Self {
        match config {
            ReplayStorageConfig::Memory { .. } => Self::Memory(MemoryReplayStorage::new()),
            ReplayStorageConfig::File { path, .. } => Self::File(FileReplayStorage::new(path)),
        }
    }
}

impl ReplayMarkerStorage for AnyReplayStorage {
    async fn get_marker(&self, key: &str) -> Result<Option<ReplayMarker>, ForwarderError> {
        match self {
            Self::Memory(storage) => storage.get_marker(key).await,
            Self::File(storage) => storage.get_marker(key).await,
        }
    }

    async fn set_marker(&self, key: &str, marker: ReplayMarker) -> Result<(), ForwarderError> {
        match self {
            Self::Memory(storage) => storage.set_marker(key, marker).await,
            Self::File(storage) => storage.set_marker(key, marker).await,
        }
    }
}

/// Per-source view of a shared storage
///
/// Remembers the last marker of each channel so the storage is read at most
/// once per channel. With `ignore_errors` storage failures are logged and the
/// event is treated as unseen.
#[derive(Debug)]
pub struct ReplayTracker {
    storage: Arc<AnyReplayStorage>,
    key_prefix: String,
    ignore_errors: bool,
    markers: HashMap<String, Option<ReplayMarker>>,
}

impl ReplayTracker {
    pub fn new(storage: Arc<AnyReplayStorage>, key_prefix: impl Into<String>, ignore_errors: bool) -> Self {
        Self {
            storage,
            key_prefix: key_prefix.into(),
            ignore_errors,
            markers: HashMap::new(),
        }
    }

    /// Storage key of `channel`
    pub fn key(&self, channel: &str) -> String {
        format!("{}:{}", self.key_prefix, channel)
    }

    /// Last stored marker of `channel`
    pub async fn marker(&mut self, channel: &str) -> Result<Option<ReplayMarker>, ForwarderError> {
        if let Some(marker) = self.markers.get(channel) {
            return Ok(*marker);
        }

        let key = self.key(channel);
        let marker = match self.storage.get_marker(&key).await {
            Ok(marker) => marker,
            Err(e) if self.ignore_errors => {
                error!(key = %key, error = %e, "Failed to get the replay marker, ignoring");
                None
            }
            Err(e) => return Err(e),
        };
        self.markers.insert(channel.to_string(), marker);
        Ok(marker)
    }

    /// Record `replay_id` for `channel`
    ///
    /// Returns `false` when the event is at or below the stored marker, i.e.
    /// it was already received by an earlier run.
    pub async fn accept(&mut self, channel: &str, replay_id: ReplayMarker) -> Result<bool, ForwarderError> {
        if let Some(marker) = self.marker(channel).await? {
            if replay_id <= marker {
                debug!(channel, replay_id, marker, "Skipping already received event");
                return Ok(false);
            }
        }

        let key = self.key(channel);
        match self.storage.set_marker(&key, replay_id).await {
            Ok(()) => {}
            Err(e) if self.ignore_errors => {
                error!(key = %key, error = %e, "Failed to store the replay marker, ignoring");
            }
            Err(e) => return Err(e),
        }
        self.markers.insert(channel.to_string(), Some(replay_id));
        Ok(true)
    }
}
