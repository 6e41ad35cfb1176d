//! Local fallback persistence.
//!
//! Activities written while the remote store is unavailable land here, as
//! JSON blobs keyed per profile. Earlier builds used a single shared
//! `activities` key that leaked entries across accounts on the same device;
//! this store keys every list by profile id and adopts legacy single-key
//! data on first read.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::{StoreError, StoreResult};
use crate::models::ActivityLogEntry;

/// File name of the legacy profile-agnostic activity list.
pub const LEGACY_ACTIVITIES_KEY: &str = "activities";

/// On-device persistence for activity lists and the replay outbox.
pub trait LocalStore: Clone + Send + Sync + 'static {
    fn load_activities(&self, user_id: &str) -> StoreResult<Vec<ActivityLogEntry>>;
    fn save_activities(&self, user_id: &str, entries: &[ActivityLogEntry]) -> StoreResult<()>;

    /// Entries written locally that still await remote replay.
    fn load_outbox(&self, user_id: &str) -> StoreResult<Vec<ActivityLogEntry>>;
    fn save_outbox(&self, user_id: &str, entries: &[ActivityLogEntry]) -> StoreResult<()>;
}

/// JSON-file-backed store, one file per profile and list kind.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn activities_path(&self, user_id: &str) -> PathBuf {
        self.dir
            .join(format!("activities-{}.json", sanitize_key(user_id)))
    }

    fn outbox_path(&self, user_id: &str) -> PathBuf {
        self.dir
            .join(format!("outbox-{}.json", sanitize_key(user_id)))
    }

    fn legacy_path(&self) -> PathBuf {
        self.dir.join(format!("{LEGACY_ACTIVITIES_KEY}.json"))
    }

    fn read_list(path: &Path) -> StoreResult<Vec<ActivityLogEntry>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            StoreError::Local(format!("failed to read {}: {error}", path.display()))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_list(&self, path: &Path, entries: &[ActivityLogEntry]) -> StoreResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|error| {
            StoreError::Local(format!(
                "failed to create {}: {error}",
                self.dir.display()
            ))
        })?;

        let serialized = serde_json::to_string_pretty(entries)?;
        std::fs::write(path, serialized).map_err(|error| {
            StoreError::Local(format!("failed to write {}: {error}", path.display()))
        })
    }

    /// Move this profile's entries out of the legacy single-key file.
    ///
    /// The remainder stays behind for other profiles; the legacy file is
    /// removed once drained.
    fn adopt_legacy_entries(&self, user_id: &str) -> StoreResult<Vec<ActivityLogEntry>> {
        let legacy_path = self.legacy_path();
        if !legacy_path.exists() {
            return Ok(Vec::new());
        }

        let legacy = Self::read_list(&legacy_path)?;
        let (mine, others): (Vec<_>, Vec<_>) = legacy
            .into_iter()
            .partition(|entry| entry.user_id == user_id);

        if mine.is_empty() {
            return Ok(Vec::new());
        }

        if others.is_empty() {
            std::fs::remove_file(&legacy_path).map_err(|error| {
                StoreError::Local(format!(
                    "failed to remove {}: {error}",
                    legacy_path.display()
                ))
            })?;
        } else {
            self.write_list(&legacy_path, &others)?;
        }

        tracing::info!(
            count = mine.len(),
            user_id,
            "Migrated legacy local activities to per-profile storage"
        );
        Ok(mine)
    }
}

impl LocalStore for JsonFileStore {
    fn load_activities(&self, user_id: &str) -> StoreResult<Vec<ActivityLogEntry>> {
        let path = self.activities_path(user_id);
        let mut entries = Self::read_list(&path)?;

        let adopted = self.adopt_legacy_entries(user_id)?;
        if !adopted.is_empty() {
            entries.extend(adopted);
            self.write_list(&path, &entries)?;
        }

        Ok(entries)
    }

    fn save_activities(&self, user_id: &str, entries: &[ActivityLogEntry]) -> StoreResult<()> {
        self.write_list(&self.activities_path(user_id), entries)
    }

    fn load_outbox(&self, user_id: &str) -> StoreResult<Vec<ActivityLogEntry>> {
        Self::read_list(&self.outbox_path(user_id))
    }

    fn save_outbox(&self, user_id: &str, entries: &[ActivityLogEntry]) -> StoreResult<()> {
        self.write_list(&self.outbox_path(user_id), entries)
    }
}

fn sanitize_key(value: &str) -> String {
    value
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// In-memory store for tests and local-only demos.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    lists: Arc<Mutex<HashMap<String, Vec<ActivityLogEntry>>>>,
    fail_saves: Arc<AtomicBool>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent saves fail, to exercise local-write error paths.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    fn load(&self, key: &str) -> Vec<ActivityLogEntry> {
        self.lists
            .lock()
            .map(|lists| lists.get(key).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn save(&self, key: String, entries: &[ActivityLogEntry]) -> StoreResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Local("memory store save disabled".to_string()));
        }

        self.lists
            .lock()
            .map_err(|_| StoreError::Local("memory store poisoned".to_string()))?
            .insert(key, entries.to_vec());
        Ok(())
    }
}

impl LocalStore for MemoryStore {
    fn load_activities(&self, user_id: &str) -> StoreResult<Vec<ActivityLogEntry>> {
        Ok(self.load(&format!("activities:{user_id}")))
    }

    fn save_activities(&self, user_id: &str, entries: &[ActivityLogEntry]) -> StoreResult<()> {
        self.save(format!("activities:{user_id}"), entries)
    }

    fn load_outbox(&self, user_id: &str) -> StoreResult<Vec<ActivityLogEntry>> {
        Ok(self.load(&format!("outbox:{user_id}")))
    }

    fn save_outbox(&self, user_id: &str, entries: &[ActivityLogEntry]) -> StoreResult<()> {
        self.save(format!("outbox:{user_id}"), entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityCategory, ActivityDraft, ActivityLogEntry};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn entry(user_id: &str) -> ActivityLogEntry {
        ActivityLogEntry::from_draft(
            user_id,
            ActivityDraft {
                crop: "Rice".to_string(),
                category: ActivityCategory::Irrigation,
                description: "Watered the paddy".to_string(),
                quantity: None,
                unit: None,
                date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                notes: None,
            },
        )
    }

    #[test]
    fn file_store_round_trips_activities() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        assert!(store.load_activities("user-1").unwrap().is_empty());

        let entries = vec![entry("user-1"), entry("user-1")];
        store.save_activities("user-1", &entries).unwrap();
        assert_eq!(store.load_activities("user-1").unwrap(), entries);
    }

    #[test]
    fn file_store_keys_lists_per_profile() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        store.save_activities("user-1", &[entry("user-1")]).unwrap();
        store
            .save_activities("user-2", &[entry("user-2"), entry("user-2")])
            .unwrap();

        assert_eq!(store.load_activities("user-1").unwrap().len(), 1);
        assert_eq!(store.load_activities("user-2").unwrap().len(), 2);
    }

    #[test]
    fn file_store_outbox_is_separate_from_activities() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        store.save_outbox("user-1", &[entry("user-1")]).unwrap();
        assert!(store.load_activities("user-1").unwrap().is_empty());
        assert_eq!(store.load_outbox("user-1").unwrap().len(), 1);
    }

    #[test]
    fn legacy_single_key_data_migrates_once() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        let legacy_path = dir.path().join("activities.json");
        let legacy = vec![entry("user-1"), entry("user-2"), entry("user-1")];
        std::fs::write(&legacy_path, serde_json::to_string(&legacy).unwrap()).unwrap();

        // First read adopts this profile's entries.
        let mine = store.load_activities("user-1").unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|e| e.user_id == "user-1"));

        // Other profiles' entries remain in the legacy file.
        assert!(legacy_path.exists());
        let theirs = store.load_activities("user-2").unwrap();
        assert_eq!(theirs.len(), 1);
        assert!(!legacy_path.exists());

        // Second read does not duplicate.
        assert_eq!(store.load_activities("user-1").unwrap().len(), 2);
    }

    #[test]
    fn memory_store_fail_saves_surfaces_error() {
        let store = MemoryStore::new();
        store.save_activities("user-1", &[entry("user-1")]).unwrap();

        store.set_fail_saves(true);
        let error = store
            .save_activities("user-1", &[entry("user-1")])
            .unwrap_err();
        assert!(matches!(error, StoreError::Local(_)));
    }

    #[test]
    fn sanitize_key_replaces_path_characters() {
        assert_eq!(sanitize_key("user-1"), "user-1");
        assert_eq!(sanitize_key("../evil"), "___evil");
    }
}
