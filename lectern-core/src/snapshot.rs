// lectern-core/src/snapshot.rs
// Persistence of remote scan results. A snapshot is usable only if its cache
// key exactly matches the currently configured source list and it is younger
// than the freshness window; a key change alone forces a rescan.
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use lectern_common::cache::Cache;
use lectern_common::config::Config;
use lectern_common::error::Result;
use lectern_common::model::CachedPatch;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const SNAPSHOT_FILE: &str = "update_check.json";
const FRESHNESS_WINDOW: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotData {
    pub cache_key: String,
    pub patches: HashMap<String, CachedPatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub timestamp: u64,
    pub data: SnapshotData,
}

pub struct SnapshotStore {
    config: Config,
}

impl SnapshotStore {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Loads whatever snapshot is on disk, valid or not. Missing and
    /// malformed files are both "no snapshot".
    pub fn load(&self) -> Option<CacheSnapshot> {
        let cache = Cache::new(&self.config).ok()?;
        let raw = cache.load_raw(SNAPSHOT_FILE).ok()?;
        match serde_json::from_str::<CacheSnapshot>(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Ignoring malformed snapshot {}: {}", SNAPSHOT_FILE, e);
                None
            }
        }
    }

    /// Loads the snapshot only if it was captured for exactly `cache_key`
    /// and is still inside the freshness window.
    pub fn load_valid(&self, cache_key: &str) -> Option<HashMap<String, CachedPatch>> {
        let snapshot = self.load()?;
        if snapshot.data.cache_key != cache_key {
            debug!("Snapshot cache key differs from configured sources; rescanning");
            return None;
        }
        let age = Self::now().saturating_sub(snapshot.timestamp);
        if age >= FRESHNESS_WINDOW.as_secs() {
            debug!("Snapshot is {age}s old; rescanning");
            return None;
        }
        debug!(
            "Reusing snapshot with {} artifacts ({age}s old)",
            snapshot.data.patches.len()
        );
        Some(snapshot.data.patches)
    }

    pub fn save(&self, cache_key: &str, patches: &HashMap<String, CachedPatch>) -> Result<()> {
        let cache = Cache::new(&self.config)?;
        let snapshot = CacheSnapshot {
            timestamp: Self::now(),
            data: SnapshotData {
                cache_key: cache_key.to_string(),
                patches: patches.clone(),
            },
        };
        cache.store_raw(SNAPSHOT_FILE, &serde_json::to_string(&snapshot)?)?;
        debug!("Saved snapshot with {} artifacts", patches.len());
        Ok(())
    }
}
