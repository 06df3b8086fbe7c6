//! File-backed snapshot store
//!
//! The whole session document is written as one JSON file. Combat state
//! is never persisted; a restart always comes up with no turn order.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::application::ports::outbound::{PersistenceError, SnapshotStorePort};
use crate::domain::aggregates::Document;

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotStorePort for FileStore {
    async fn load(&self) -> Result<Document, PersistenceError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let document: Document = serde_json::from_slice(&bytes)?;
                for violation in document.verify_integrity() {
                    tracing::warn!(%violation, "dangling bridge in persisted document");
                }
                Ok(document)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %self.path.display(),
                    "no persisted document, starting empty"
                );
                Ok(Document::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, document: &Document) -> Result<(), PersistenceError> {
        let json = serde_json::to_vec_pretty(document)?;
        // write-then-rename so a crash mid-write never truncates the snapshot
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!(path = %self.path.display(), bytes = json.len(), "document persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::EntityPayload;
    use crate::domain::entities::{Sheet, Stats};
    use crate::domain::value_objects::SheetId;
    use std::collections::BTreeMap;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir().join(format!("campaign-{}.json", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty_document() {
        let store = FileStore::new(scratch_path());
        let document = store.load().await.unwrap();
        assert!(document.players.is_empty());
        assert!(document.catalog.sheets.is_empty());
    }

    #[tokio::test]
    async fn test_document_survives_save_and_load() {
        let path = scratch_path();
        let store = FileStore::new(path.clone());

        let mut document = Document::default();
        document
            .create(EntityPayload::Sheet(Sheet {
                id: SheetId::new("hero"),
                name: "Hero".to_string(),
                dm_only: false,
                xp_given_when_slain: 10,
                xp_cap: 100,
                stats: Stats::default(),
                proficiencies: BTreeMap::new(),
                items: BTreeMap::new(),
                actions: BTreeMap::new(),
                slain_record: BTreeMap::new(),
            }))
            .unwrap();

        store.save(&document).await.unwrap();
        let restored = store.load().await.unwrap();
        assert!(restored.catalog.sheets.contains("hero"));

        tokio::fs::remove_file(path).await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let path = scratch_path();
        tokio::fs::write(&path, b"not json").await.unwrap();
        let store = FileStore::new(path.clone());
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, PersistenceError::Serialization(_)));
        tokio::fs::remove_file(path).await.unwrap();
    }
}
