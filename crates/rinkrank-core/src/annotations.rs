// Mutable per-player annotations (picked flag, free-text note) and the
// snapshot backends they persist through.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::Database;
use crate::stats::PlayerId;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub picked: bool,
    #[serde(default)]
    pub note: String,
}

/// Full annotation mapping as written to a snapshot.
pub type Snapshot = BTreeMap<PlayerId, Annotation>;

#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    #[error("player {0} is not in the active roster")]
    UnknownPlayer(PlayerId),

    #[error("failed to access snapshot {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("JSON error in snapshot {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("snapshot storage error: {0:#}")]
    Storage(anyhow::Error),
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// Whole-mapping persistence. `save` always overwrites; there is no merge.
pub trait SnapshotBackend {
    /// Read the stored mapping, or `None` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Snapshot>, AnnotationError>;

    fn save(&self, snapshot: &Snapshot) -> Result<(), AnnotationError>;

    /// Human-readable location for log lines.
    fn describe(&self) -> String;
}

/// Flat JSON object `{ player_id: { picked, note } }`.
#[derive(Debug, Clone)]
pub struct JsonSnapshot {
    path: PathBuf,
}

impl JsonSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_err(&self, source: std::io::Error) -> AnnotationError {
        AnnotationError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl SnapshotBackend for JsonSnapshot {
    fn load(&self) -> Result<Option<Snapshot>, AnnotationError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };
        let snapshot = serde_json::from_str(&text).map_err(|e| AnnotationError::Json {
            path: self.path.display().to_string(),
            source: e,
        })?;
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), AnnotationError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let json = serde_json::to_string(snapshot).map_err(|e| AnnotationError::Json {
            path: self.path.display().to_string(),
            source: e,
        })?;
        std::fs::write(&self.path, json).map_err(|e| self.io_err(e))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Single `player_meta` key-value table in a SQLite file.
pub struct SqliteSnapshot {
    db: Database,
    path: String,
}

impl SqliteSnapshot {
    pub fn open(path: &str) -> Result<Self, AnnotationError> {
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| AnnotationError::Io {
                path: path.to_string(),
                source: e,
            })?;
        }
        let db = Database::open(path).map_err(AnnotationError::Storage)?;
        Ok(Self {
            db,
            path: path.to_string(),
        })
    }
}

impl SnapshotBackend for SqliteSnapshot {
    fn load(&self) -> Result<Option<Snapshot>, AnnotationError> {
        let rows = self.db.load_all().map_err(AnnotationError::Storage)?;
        if rows.is_empty() {
            return Ok(None);
        }
        let mut snapshot = Snapshot::new();
        for (id, value) in rows {
            match serde_json::from_value::<Annotation>(value) {
                Ok(annotation) => {
                    snapshot.insert(PlayerId::new(id), annotation);
                }
                Err(e) => warn!("skipping malformed annotation for player {id}: {e}"),
            }
        }
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), AnnotationError> {
        let entries = snapshot
            .iter()
            .map(|(id, annotation)| {
                serde_json::to_value(annotation)
                    .map(|v| (id.to_string(), v))
                    .map_err(|e| AnnotationError::Json {
                        path: self.path.clone(),
                        source: e,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.db.replace_all(&entries).map_err(AnnotationError::Storage)
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path)
    }
}

/// Pick a backend from the snapshot path: `.db` / `.sqlite` use SQLite,
/// anything else is a JSON file.
pub fn open_backend(path: &Path) -> Result<Box<dyn SnapshotBackend>, AnnotationError> {
    let is_sqlite = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("db") || e.eq_ignore_ascii_case("sqlite"));
    if is_sqlite {
        let path_str = path.to_str().ok_or_else(|| AnnotationError::Io {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "non-UTF-8 path"),
        })?;
        Ok(Box::new(SqliteSnapshot::open(path_str)?))
    } else {
        Ok(Box::new(JsonSnapshot::new(path)))
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// In-memory annotations for the working player set plus the backend they
/// are saved through.
pub struct AnnotationStore {
    entries: Snapshot,
    working_set: HashSet<PlayerId>,
    backend: Box<dyn SnapshotBackend>,
}

impl AnnotationStore {
    /// Read the snapshot if one exists and give every active player without
    /// an entry the default annotation.
    pub fn load(
        backend: Box<dyn SnapshotBackend>,
        roster: &[PlayerId],
    ) -> Result<Self, AnnotationError> {
        let (mut entries, existed) = match backend.load()? {
            Some(snapshot) => (snapshot, true),
            None => (Snapshot::new(), false),
        };

        let mut filled = 0usize;
        for id in roster {
            if !entries.contains_key(id) {
                entries.insert(id.clone(), Annotation::default());
                filled += 1;
            }
        }

        if existed {
            info!(
                "Loaded {} annotations from {} ({filled} active players defaulted)",
                entries.len() - filled,
                backend.describe()
            );
        } else {
            info!(
                "No annotation snapshot at {}, using defaults for {filled} players",
                backend.describe()
            );
        }

        Ok(Self {
            entries,
            working_set: roster.iter().cloned().collect(),
            backend,
        })
    }

    pub fn get(&self, player: &PlayerId) -> Option<&Annotation> {
        self.entries.get(player)
    }

    /// Every entry, including snapshot entries for players outside the
    /// working set.
    pub fn entries(&self) -> &Snapshot {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_picked(&mut self, player: &PlayerId, picked: bool) -> Result<(), AnnotationError> {
        self.entry_mut(player)?.picked = picked;
        Ok(())
    }

    pub fn set_note(
        &mut self,
        player: &PlayerId,
        note: impl Into<String>,
    ) -> Result<(), AnnotationError> {
        self.entry_mut(player)?.note = note.into();
        Ok(())
    }

    /// Write the whole mapping through the backend, replacing what was there.
    pub fn save(&self) -> Result<(), AnnotationError> {
        self.backend.save(&self.entries)?;
        info!("Saved {} annotations to {}", self.entries.len(), self.backend.describe());
        Ok(())
    }

    fn entry_mut(&mut self, player: &PlayerId) -> Result<&mut Annotation, AnnotationError> {
        if !self.working_set.contains(player) {
            return Err(AnnotationError::UnknownPlayer(player.clone()));
        }
        Ok(self.entries.entry(player.clone()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<PlayerId> {
        ["1", "2", "3"].iter().map(|&i| PlayerId::from(i)).collect()
    }

    #[test]
    fn missing_snapshot_defaults_every_active_player() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = JsonSnapshot::new(tmp.path().join("player_meta.json"));
        let store = AnnotationStore::load(Box::new(backend), &roster()).unwrap();

        assert_eq!(store.len(), 3);
        for id in roster() {
            assert_eq!(store.get(&id), Some(&Annotation::default()));
        }
    }

    #[test]
    fn mutations_touch_one_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = JsonSnapshot::new(tmp.path().join("player_meta.json"));
        let mut store = AnnotationStore::load(Box::new(backend), &roster()).unwrap();

        store.set_picked(&PlayerId::from("2"), true).unwrap();
        store.set_note(&PlayerId::from("3"), "injured").unwrap();

        assert!(!store.get(&PlayerId::from("1")).unwrap().picked);
        assert!(store.get(&PlayerId::from("2")).unwrap().picked);
        assert_eq!(store.get(&PlayerId::from("2")).unwrap().note, "");
        assert_eq!(store.get(&PlayerId::from("3")).unwrap().note, "injured");
    }

    #[test]
    fn unknown_player_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = JsonSnapshot::new(tmp.path().join("player_meta.json"));
        let mut store = AnnotationStore::load(Box::new(backend), &roster()).unwrap();

        let err = store.set_picked(&PlayerId::from("999"), true).unwrap_err();
        assert!(matches!(err, AnnotationError::UnknownPlayer(ref id) if id.as_str() == "999"));
        assert!(store.get(&PlayerId::from("999")).is_none());
    }

    #[test]
    fn json_snapshot_reads_flat_object() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("player_meta.json");
        std::fs::write(
            &path,
            r#"{"1": {"picked": true, "note": "keeper"}, "9": {"picked": false, "note": "retired"}}"#,
        )
        .unwrap();

        let store = AnnotationStore::load(Box::new(JsonSnapshot::new(&path)), &roster()).unwrap();
        assert!(store.get(&PlayerId::from("1")).unwrap().picked);
        // Active players missing from the snapshot get defaults.
        assert_eq!(store.get(&PlayerId::from("3")), Some(&Annotation::default()));
        // Inactive entries survive the round trip.
        assert_eq!(store.get(&PlayerId::from("9")).unwrap().note, "retired");
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn corrupt_json_snapshot_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("player_meta.json");
        std::fs::write(&path, "{ nope").unwrap();

        let result = AnnotationStore::load(Box::new(JsonSnapshot::new(&path)), &roster());
        assert!(matches!(result, Err(AnnotationError::Json { .. })));
    }

    #[test]
    fn json_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/player_meta.json");

        let mut store = AnnotationStore::load(Box::new(JsonSnapshot::new(&path)), &roster()).unwrap();
        store.set_picked(&PlayerId::from("1"), true).unwrap();
        store.set_note(&PlayerId::from("1"), "first round").unwrap();
        store.save().unwrap();

        let reloaded = AnnotationStore::load(Box::new(JsonSnapshot::new(&path)), &roster()).unwrap();
        let a = reloaded.get(&PlayerId::from("1")).unwrap();
        assert!(a.picked);
        assert_eq!(a.note, "first round");
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.entries(), store.entries());
    }

    #[test]
    fn sqlite_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("player_meta.db");

        // An entry for a player no longer on the roster survives the save.
        let retired = Annotation { picked: true, note: "retired".into() };
        open_backend(&path)
            .unwrap()
            .save(&[(PlayerId::from("9"), retired.clone())].into())
            .unwrap();

        let mut store = AnnotationStore::load(open_backend(&path).unwrap(), &roster()).unwrap();
        store.set_picked(&PlayerId::from("3"), true).unwrap();
        store.set_note(&PlayerId::from("2"), "watch").unwrap();
        store.save().unwrap();

        let reloaded = AnnotationStore::load(open_backend(&path).unwrap(), &roster()).unwrap();
        assert!(reloaded.get(&PlayerId::from("3")).unwrap().picked);
        assert_eq!(reloaded.get(&PlayerId::from("2")).unwrap().note, "watch");
        assert!(!reloaded.get(&PlayerId::from("1")).unwrap().picked);
        assert_eq!(reloaded.get(&PlayerId::from("9")), Some(&retired));
        assert_eq!(reloaded.len(), 4);
        assert_eq!(reloaded.entries(), store.entries());
    }

    #[test]
    fn backend_selected_by_extension() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(open_backend(&tmp.path().join("m.sqlite"))
            .unwrap()
            .describe()
            .starts_with("sqlite:"));
        assert!(!open_backend(&tmp.path().join("m.json"))
            .unwrap()
            .describe()
            .starts_with("sqlite:"));
    }
}
