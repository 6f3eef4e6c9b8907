use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, SimwatchError};

/// Snapshot file name inside the configuration directory
pub const SNAPSHOT_FILE: &str = "characters.json";

/// Persisted map from `name@realm` identity to the last-seen normalized
/// character record. Loaded once at startup and written once after a full
/// pass; a crash mid-run loses that run's updates atomically.
///
/// The on-disk blob is a serde_json serialization of the whole map, which
/// round-trips every scalar type and all nesting exactly — the differ is
/// type-sensitive, so `32` and `"32"` must survive as themselves.
pub struct SnapshotStore {
    path: PathBuf,
    entries: HashMap<String, Value>,
}

impl SnapshotStore {
    /// Load the store from `<confdir>/characters.json`. A missing file means
    /// an empty store; an unreadable or corrupt file is fatal for the run.
    pub fn open(confdir: &Path) -> Result<Self> {
        let path = confdir.join(SNAPSHOT_FILE);
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content).map_err(|e| {
                SimwatchError::Cache(format!(
                    "snapshot file {} is corrupt: {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            HashMap::new()
        };
        Ok(Self { path, entries })
    }

    pub fn get(&self, identity: &str) -> Option<&Value> {
        self.entries.get(identity)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    /// Record the latest fetched record for an identity, replacing any prior
    /// snapshot. In-memory only until `persist` runs.
    pub fn record(&mut self, identity: &str, record: Value) {
        self.entries.insert(identity.to_string(), record);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the whole map back to the snapshot file, overwriting it.
    pub fn persist(&self) -> Result<()> {
        let content = serde_json::to_string(&self.entries)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_file_means_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SNAPSHOT_FILE), "not json at all").unwrap();
        assert!(matches!(
            SnapshotStore::open(dir.path()),
            Err(SimwatchError::Cache(_))
        ));
    }

    #[test]
    fn test_roundtrip_preserves_scalar_types() {
        let dir = tempfile::tempdir().unwrap();
        let record = json!({
            "level": 100,
            "name": "nameone",
            "ilvl": 32,
            "ilvl_str": "32",
            "ratio": 19.5,
            "alive": true,
            "spec": null,
            "items": {"shoulder": {"armor": 71}},
            "talents": [{"tier": 1}, {"tier": 2}]
        });

        let mut store = SnapshotStore::open(dir.path()).unwrap();
        store.record("nameone@realmone", record.clone());
        store.persist().unwrap();

        let reloaded = SnapshotStore::open(dir.path()).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("nameone@realmone"), Some(&record));
        // type-sensitivity survives the round trip
        let loaded = reloaded.get("nameone@realmone").unwrap();
        assert!(loaded["ilvl"].is_i64());
        assert!(loaded["ilvl_str"].is_string());
        assert!(loaded["ratio"].is_f64());
    }

    #[test]
    fn test_record_overwrites_prior_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SnapshotStore::open(dir.path()).unwrap();
        store.record("c@r", json!({"v": 1}));
        store.record("c@r", json!({"v": 2}));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("c@r"), Some(&json!({"v": 2})));
    }

    #[test]
    fn test_persist_overwrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SnapshotStore::open(dir.path()).unwrap();
        store.record("a@b", json!({"v": 1}));
        store.persist().unwrap();

        let mut store = SnapshotStore::open(dir.path()).unwrap();
        store.record("c@d", json!({"v": 2}));
        store.persist().unwrap();

        let reloaded = SnapshotStore::open(dir.path()).unwrap();
        assert_eq!(reloaded.len(), 2);
    }
}
