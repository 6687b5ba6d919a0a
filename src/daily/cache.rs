//! On-disk snapshot of the daily-material table.
//!
//! Readers always get the last good table without waiting on the network.
//! A refresh runs in the background when the snapshot is missing, corrupt
//! or older than [`STALE_AFTER`], and at most one refresh is in flight.

use serde::Serialize;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;

use super::client::DailySource;
use super::table::DailyMaterialTable;
use crate::config::STALE_AFTER;
use crate::error::{FetchError, SnapshotError};

pub const SNAPSHOT_FILE: &str = "daily_material.json";

/// Bump whenever the serialized shape of [`DailyMaterialTable`] changes
pub const SNAPSHOT_VERSION: u32 = 1;

pub struct ReferenceDataCache {
    path: PathBuf,
    source: Arc<dyn DailySource>,
    current: RwLock<Arc<DailyMaterialTable>>,
    refresh: Arc<Mutex<()>>,
}

impl ReferenceDataCache {
    /// Create an empty cache backed by `cache_dir/daily_material.json`
    pub fn new(cache_dir: &Path, source: Arc<dyn DailySource>) -> Arc<Self> {
        Arc::new(Self {
            path: cache_dir.join(SNAPSHOT_FILE),
            source,
            current: RwLock::new(Arc::new(DailyMaterialTable::default())),
            refresh: Arc::new(Mutex::new(())),
        })
    }

    /// Get the snapshot file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current table; empty until the first successful load
    pub fn get(&self) -> Arc<DailyMaterialTable> {
        let current = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&current)
    }

    /// Load the snapshot if there is one, then make sure it is fresh.
    ///
    /// A snapshot that cannot be read is deleted and replaced right away,
    /// whatever its modification time says.
    pub async fn initialize(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        match read_snapshot(&self.path).await {
            Ok(Some(table)) => {
                tracing::debug!(path = %self.path.display(), "Loaded daily material snapshot");
                self.swap(table);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Discarding unreadable daily material snapshot",
                );
                if let Err(e) = tokio::fs::remove_file(&self.path).await {
                    tracing::warn!(error = %e, "Failed to remove daily material snapshot");
                }
                return self.schedule_refresh(false).await;
            }
        }

        self.ensure_fresh().await
    }

    /// Schedule a background refresh if the snapshot is missing or stale.
    ///
    /// Returns the refresh task when one was started. Calls made while a
    /// refresh is already running do nothing.
    pub async fn ensure_fresh(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        self.schedule_refresh(true).await
    }

    /// Refresh now and wait for the result, regardless of staleness
    pub async fn refresh(&self) -> Result<(), FetchError> {
        let _guard = self.refresh.lock().await;
        self.refresh_locked().await
    }

    /// Age of the snapshot file, if there is one
    pub async fn snapshot_age(&self) -> Option<Duration> {
        let modified = tokio::fs::metadata(&self.path)
            .await
            .and_then(|m| m.modified())
            .ok()?;
        SystemTime::now().duration_since(modified).ok()
    }

    async fn schedule_refresh(self: &Arc<Self>, only_if_stale: bool) -> Option<JoinHandle<()>> {
        let Ok(guard) = Arc::clone(&self.refresh).try_lock_owned() else {
            tracing::debug!("Daily material refresh already in flight");
            return None;
        };

        if only_if_stale && !self.is_stale().await {
            return None;
        }

        Some(self.spawn_refresh(guard))
    }

    async fn is_stale(&self) -> bool {
        match tokio::fs::metadata(&self.path).await.and_then(|m| m.modified()) {
            Ok(modified) => snapshot_is_stale(modified, SystemTime::now(), STALE_AFTER),
            Err(_) => true,
        }
    }

    fn spawn_refresh(self: &Arc<Self>, guard: OwnedMutexGuard<()>) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = guard;
            tracing::info!("Refreshing daily material cache");
            if let Err(e) = cache.refresh_locked().await {
                tracing::warn!(error = %e, "Keeping previous daily material table");
            }
        })
    }

    /// Caller must hold the refresh lock
    async fn refresh_locked(&self) -> Result<(), FetchError> {
        let table = self.source.fetch().await?;

        if let Err(e) = write_snapshot(&self.path, &table).await {
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Failed to write daily material snapshot",
            );
        }
        self.swap(table);

        tracing::info!("Daily material cache refreshed");
        Ok(())
    }

    fn swap(&self, table: DailyMaterialTable) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Arc::new(table);
    }
}

/// True when a file modified at `modified` is older than `max_age` at `now`.
/// Timestamps in the future count as fresh.
pub fn snapshot_is_stale(modified: SystemTime, now: SystemTime, max_age: Duration) -> bool {
    now.duration_since(modified)
        .map(|age| age > max_age)
        .unwrap_or(false)
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    table: &'a DailyMaterialTable,
}

/// Serialize a table into the snapshot format
pub fn encode_snapshot(table: &DailyMaterialTable) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&SnapshotRef {
        version: SNAPSHOT_VERSION,
        table,
    })
}

/// Decode a snapshot, rejecting other versions and malformed payloads
pub fn decode_snapshot(bytes: &[u8]) -> Result<DailyMaterialTable, SnapshotError> {
    let mut envelope: Value = serde_json::from_slice(bytes)?;

    let found = envelope
        .get("version")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0);
    if found != SNAPSHOT_VERSION {
        return Err(SnapshotError::Version {
            found,
            expected: SNAPSHOT_VERSION,
        });
    }

    let table = envelope.get_mut("table").map(Value::take).unwrap_or(Value::Null);
    Ok(serde_json::from_value(table)?)
}

async fn read_snapshot(path: &Path) -> Result<Option<DailyMaterialTable>, SnapshotError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => decode_snapshot(&bytes).map(Some),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Full overwrite through a temporary file, so readers never see half a snapshot
async fn write_snapshot(path: &Path, table: &DailyMaterialTable) -> Result<(), SnapshotError> {
    let bytes = encode_snapshot(table)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
