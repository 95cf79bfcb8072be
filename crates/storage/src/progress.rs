use std::sync::Arc;

use narrator_core::model::{PersistedProgress, Subject};
use tracing::debug;

use crate::repository::{KeyValueStore, StorageError};

/// Typed access to per-subject progress records.
///
/// Records live under `progress_<subject>` as JSON
/// (`{"index":..,"part":..,"studyTime":..}`).
#[derive(Clone)]
pub struct ProgressStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Load saved progress for a subject.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store cannot be read and
    /// `StorageError::Serialization` if the stored value is not valid JSON.
    pub async fn load(&self, subject: &Subject) -> Result<Option<PersistedProgress>, StorageError> {
        let key = subject.progress_key();
        let Some(raw) = self.kv.get(&key).await? else {
            debug!(%key, "no saved progress");
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| StorageError::Serialization(err.to_string()))
    }

    /// Persist progress for a subject, replacing the previous record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be encoded or stored.
    pub async fn save(
        &self,
        subject: &Subject,
        progress: &PersistedProgress,
    ) -> Result<(), StorageError> {
        let value = serde_json::to_string(progress)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.kv.set(&subject.progress_key(), &value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryStore;
    use narrator_core::model::Part;

    fn subject() -> Subject {
        Subject::parse("history").unwrap()
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = ProgressStore::new(Arc::new(InMemoryStore::new()));
        let progress = PersistedProgress {
            index: 4,
            part: Part::Answer,
            study_time: 321,
        };
        store.save(&subject(), &progress).await.unwrap();
        assert_eq!(store.load(&subject()).await.unwrap(), Some(progress));
    }

    #[tokio::test]
    async fn writes_under_progress_key_as_json() {
        let kv = InMemoryStore::new();
        let store = ProgressStore::new(Arc::new(kv.clone()));
        store
            .save(&subject(), &PersistedProgress::default())
            .await
            .unwrap();

        let raw = kv.get("progress_history").await.unwrap().unwrap();
        assert_eq!(raw, r#"{"index":0,"part":"question","studyTime":0}"#);
    }

    #[tokio::test]
    async fn corrupt_record_is_a_serialization_error() {
        let kv = InMemoryStore::new();
        kv.set("progress_history", "not json").await.unwrap();
        let store = ProgressStore::new(Arc::new(kv));

        let err = store.load(&subject()).await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
