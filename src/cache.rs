//! Generic persistent record-list cache.
//!
//! Each data source owns one named snapshot file: a JSON envelope holding
//! the full record list and the time it was written. Saves replace the
//! whole file atomically; there is no partial update. Loads are
//! deliberately forgiving — an absent, truncated, corrupt, or empty
//! payload all come back as the same "miss" so callers always fall back
//! to a fresh rescan instead of trusting questionable data.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Anything shorter than this can't be a usable envelope.
const DEGENERATE_PAYLOAD_LEN: usize = 8;

/// The persisted envelope: full record list plus write timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSnapshot<T> {
    pub records: Vec<T>,
    #[serde(default)]
    pub last_updated_at_millis: i64,
}

/// A named, versionless record-list cache backed by one JSON file.
pub struct CacheStore<T> {
    path: PathBuf,
    _records: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> CacheStore<T> {
    /// Cache named `name` under the default cache directory.
    pub fn new(name: &str) -> Self {
        Self::in_dir(&Self::default_dir(), name)
    }

    /// Cache named `name` under an explicit directory.
    pub fn in_dir(dir: &Path, name: &str) -> Self {
        Self {
            path: dir.join(format!("{name}.json")),
            _records: PhantomData,
        }
    }

    fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("scout")
    }

    /// Load the cached record list.
    ///
    /// Returns `None` when nothing usable is cached: no file, unreadable
    /// file, degenerate payload, empty record list, or any decode error.
    /// The cases are indistinguishable on purpose.
    pub fn load(&self) -> Option<Vec<T>> {
        let snapshot = self.read_snapshot()?;
        if snapshot.records.is_empty() {
            debug!(path = %self.path.display(), "cache holds an empty list, treating as miss");
            return None;
        }
        Some(snapshot.records)
    }

    /// Persist the full record list plus a fresh timestamp in one atomic
    /// replace. Returns `false` on any failure, leaving the prior cache
    /// intact. Never panics.
    pub fn save(&self, records: &[T]) -> bool {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Envelope<'a, T> {
            records: &'a [T],
            last_updated_at_millis: i64,
        }

        let envelope = Envelope {
            records,
            last_updated_at_millis: now_millis(),
        };

        let json = match serde_json::to_string(&envelope) {
            Ok(json) => json,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cache encode failed");
                return false;
            }
        };

        if let Some(parent) = self.path.parent() {
            if fs::create_dir_all(parent).is_err() {
                return false;
            }
        }

        // Write to a sibling temp file, then rename over the old snapshot.
        let tmp = self.path.with_extension("json.tmp");
        if let Err(e) = fs::write(&tmp, json) {
            warn!(path = %tmp.display(), error = %e, "cache write failed");
            return false;
        }
        match fs::rename(&tmp, &self.path) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cache replace failed");
                let _ = fs::remove_file(&tmp);
                false
            }
        }
    }

    /// Timestamp of the last successful save, 0 if never saved (or the
    /// envelope is unreadable).
    pub fn last_updated_at_millis(&self) -> i64 {
        self.read_snapshot()
            .map(|s| s.last_updated_at_millis)
            .unwrap_or(0)
    }

    /// Remove the snapshot file. A subsequent load is a miss.
    pub fn clear(&self) {
        let _ = fs::remove_file(&self.path);
    }

    fn read_snapshot(&self) -> Option<CachedSnapshot<T>> {
        let raw = fs::read_to_string(&self.path).ok()?;
        if raw.len() < DEGENERATE_PAYLOAD_LEN {
            debug!(path = %self.path.display(), "cache payload degenerate, treating as miss");
            return None;
        }
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "cache decode failed, treating as miss");
                None
            }
        }
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> CacheStore<String> {
        CacheStore::in_dir(dir.path(), "test")
    }

    #[test]
    fn test_load_without_save_is_miss() {
        let dir = TempDir::new().unwrap();
        assert_eq!(store(&dir).load(), None);
        assert_eq!(store(&dir).last_updated_at_millis(), 0);
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = store(&dir);
        let records = vec!["a".to_string(), "b".to_string()];

        assert!(cache.save(&records));
        assert_eq!(cache.load(), Some(records));
        assert!(cache.last_updated_at_millis() > 0);
    }

    #[test]
    fn test_empty_save_is_miss_on_load() {
        let dir = TempDir::new().unwrap();
        let cache = store(&dir);

        assert!(cache.save(&[]));
        assert_eq!(cache.load(), None);
        // The write still happened, so the timestamp is real.
        assert!(cache.last_updated_at_millis() > 0);
    }

    #[test]
    fn test_corrupt_payload_is_miss() {
        let dir = TempDir::new().unwrap();
        let cache = store(&dir);
        fs::write(dir.path().join("test.json"), "{not json at all!}").unwrap();
        assert_eq!(cache.load(), None);
    }

    #[test]
    fn test_degenerate_payload_is_miss() {
        let dir = TempDir::new().unwrap();
        let cache = store(&dir);
        fs::write(dir.path().join("test.json"), "[]").unwrap();
        assert_eq!(cache.load(), None);
    }

    #[test]
    fn test_missing_optional_timestamp_defaults() {
        let dir = TempDir::new().unwrap();
        let cache = store(&dir);
        fs::write(dir.path().join("test.json"), r#"{"records":["x"]}"#).unwrap();
        assert_eq!(cache.load(), Some(vec!["x".to_string()]));
        assert_eq!(cache.last_updated_at_millis(), 0);
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let cache = store(&dir);
        cache.save(&["x".to_string()]);
        cache.clear();
        assert_eq!(cache.load(), None);
    }
}
