use crate::catalog::RawProductRow;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CACHE_TTL: Duration = Duration::from_secs(12 * 60 * 60);

const CACHE_FILE: &str = "catalog_cache.json";

/// Raw dataset plus its fetch timestamp (unix milliseconds). Stored as one
/// JSON payload so an entry is either fully present or a miss.
#[derive(Debug, Serialize, Deserialize)]
pub struct CachedDataset {
    pub rows: Vec<RawProductRow>,
    pub fetched_at: i64,
}

pub fn now_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Time-boxed cache for the last-fetched raw catalog. Caching is a pure
/// optimization: every failure path degrades to a miss or a logged warning,
/// never an error for the caller.
pub struct CatalogCache {
    path: PathBuf,
}

impl CatalogCache {
    pub fn new(storage_dir: impl AsRef<Path>) -> Self {
        Self {
            path: storage_dir.as_ref().join(CACHE_FILE),
        }
    }

    pub fn read(&self) -> Option<Vec<RawProductRow>> {
        self.read_at(now_ms())
    }

    fn read_at(&self, now_ms: i64) -> Option<Vec<RawProductRow>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                log::warn!("Unable to read catalog cache: {err}");
                return None;
            }
        };
        let entry: CachedDataset = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("Corrupt catalog cache treated as a miss: {err}");
                return None;
            }
        };
        let age = now_ms.saturating_sub(entry.fetched_at);
        if age > CACHE_TTL.as_millis() as i64 {
            self.clear();
            return None;
        }
        Some(entry.rows)
    }

    pub fn write(&self, rows: &[RawProductRow]) {
        self.write_at(rows, now_ms());
    }

    fn write_at(&self, rows: &[RawProductRow], fetched_at: i64) {
        let entry = CachedDataset {
            rows: rows.to_vec(),
            fetched_at,
        };
        if let Err(err) = self.try_write(&entry) {
            log::warn!("Unable to write catalog cache: {err}");
        }
    }

    fn try_write(&self, entry: &CachedDataset) -> Result<(), anyhow::Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string(entry)?)?;
        Ok(())
    }

    pub fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => log::warn!("Unable to clear catalog cache: {err}"),
        }
    }
}
