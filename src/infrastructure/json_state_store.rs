// JSON file snapshot store
use crate::application::state_store::StateStore;
use crate::domain::door_state::EngineSnapshot;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// One `<door_id>.json` file per door under a directory.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    dir: PathBuf,
}

impl JsonStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, door_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(door_id)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Encode a door id as a file stem. ASCII alphanumerics and `-` pass through,
/// every other byte becomes `_XX`, so distinct ids never share a file and no
/// id can escape the directory.
fn file_stem(door_id: &str) -> String {
    let mut stem = String::with_capacity(door_id.len());
    for byte in door_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("_{:02X}", byte));
        }
    }
    stem
}

#[async_trait]
impl StateStore for JsonStateStore {
    async fn load(&self, door_id: &str) -> Result<Option<EngineSnapshot>> {
        let path = self.path_for(door_id);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };

        let snapshot = serde_json::from_slice(&raw)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(snapshot))
    }

    async fn save(&self, door_id: &str, snapshot: &EngineSnapshot) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let path = self.path_for(door_id);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(snapshot)?;

        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::door_state::{DoorState, NextAction};
    use chrono::Utc;

    fn snapshot() -> EngineSnapshot {
        EngineSnapshot {
            door_state: DoorState::PartiallyOpen,
            next_action: NextAction::Close,
            current_percent: Some(42.5),
            last_percent: Some(40.0),
            state_stable_since: Some(Utc::now()),
            active_mode: true,
            history: vec![40.0, 42.5],
        }
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStateStore::new(dir.path());

        assert!(store.load("garage").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStateStore::new(dir.path().join("nested"));
        let snapshot = snapshot();

        store.save("garage", &snapshot).await.unwrap();
        assert_eq!(store.load("garage").await.unwrap(), Some(snapshot.clone()));

        let mut newer = snapshot;
        newer.door_state = DoorState::Closed;
        store.save("garage", &newer).await.unwrap();
        assert_eq!(store.load("garage").await.unwrap(), Some(newer));
        assert!(!store.dir().join("garage.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_door_id_cannot_escape_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStateStore::new(dir.path());

        store.save("../evil", &snapshot()).await.unwrap();
        assert!(dir.path().join("_2E_2E_2Fevil.json").exists());
    }

    #[test]
    fn test_file_stem_is_injective() {
        assert_eq!(file_stem("garage-1"), "garage-1");
        assert_eq!(file_stem("garage.left"), "garage_2Eleft");
        assert_eq!(file_stem("garage_left"), "garage_5Fleft");
        assert_ne!(file_stem("a_2E"), file_stem("a."));
    }

    #[tokio::test]
    async fn test_similar_door_ids_keep_separate_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStateStore::new(dir.path());
        let mut closed = snapshot();
        closed.door_state = DoorState::Closed;

        store.save("garage.left", &closed).await.unwrap();
        assert!(store.load("garage_left").await.unwrap().is_none());

        let partial = snapshot();
        store.save("garage_left", &partial).await.unwrap();
        assert_eq!(store.load("garage.left").await.unwrap(), Some(closed));
        assert_eq!(store.load("garage_left").await.unwrap(), Some(partial));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("garage.json"), b"{ not json").unwrap();
        let store = JsonStateStore::new(dir.path());

        assert!(store.load("garage").await.is_err());
    }
}
