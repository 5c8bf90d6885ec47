use super::StatusStore;
use crate::error::Result;
use crate::models::StatusRecord;
use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

/// Concurrent in-memory status store.
///
/// Safe for access from all workers without engine-level locks: entries are
/// keyed by document ID and each document is owned by one worker at a time.
#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    records: DashMap<Uuid, StatusRecord>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn put(&self, record: StatusRecord) -> Result<()> {
        self.records.insert(record.document_id, record);
        Ok(())
    }

    async fn get(&self, document_id: Uuid) -> Result<Option<StatusRecord>> {
        Ok(self.records.get(&document_id).map(|r| r.value().clone()))
    }

    async fn list(&self) -> Result<Vec<StatusRecord>> {
        Ok(self.records.iter().map(|r| r.value().clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::DocumentState;

    #[test]
    fn test_put_get_round_trip() {
        tokio_test::block_on(async {
            let store = InMemoryStatusStore::new();
            let id = Uuid::new_v4();

            assert!(store.get(id).await.unwrap().is_none());

            store.put(StatusRecord::queued(id)).await.unwrap();
            let record = store.get(id).await.unwrap().unwrap();
            assert_eq!(record.document_id, id);
            assert_eq!(record.state, DocumentState::Queued);
        });
    }

    #[test]
    fn test_put_is_full_overwrite() {
        tokio_test::block_on(async {
            let store = InMemoryStatusStore::new();
            let id = Uuid::new_v4();

            let mut record = StatusRecord::queued(id);
            record.last_error = Some("first attempt failed".to_string());
            store.put(record).await.unwrap();

            // A replacement without the error must not merge with the old one.
            store.put(StatusRecord::queued(id)).await.unwrap();
            let stored = store.get(id).await.unwrap().unwrap();
            assert!(stored.last_error.is_none());
        });
    }

    #[test]
    fn test_list_returns_one_record_per_document() {
        tokio_test::block_on(async {
            let store = InMemoryStatusStore::new();
            let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();

            for id in &ids {
                store.put(StatusRecord::queued(*id)).await.unwrap();
                // Second write for the same document must not duplicate it.
                store.put(StatusRecord::queued(*id)).await.unwrap();
            }

            let all = store.list().await.unwrap();
            assert_eq!(all.len(), ids.len());
            for id in &ids {
                assert_eq!(all.iter().filter(|r| r.document_id == *id).count(), 1);
            }
        });
    }
}
