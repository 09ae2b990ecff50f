use crate::{DocumentStore, RecordQuery};
use async_trait::async_trait;
use outreach_core::{ContentRecord, CoreError, PageId, RecordStatus, StoreError, StoredRecord};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Document store kept in process memory. Used when Notion is not configured
/// and in tests.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    records: RwLock<Vec<StoredRecord>>,
    next_id: AtomicUsize,
    create_calls: AtomicUsize,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub async fn records(&self) -> Vec<StoredRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create(&self, record: &ContentRecord) -> Result<PageId, CoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let page_id = PageId(format!("mem-{}", id));

        self.records.write().await.push(StoredRecord {
            page_id: page_id.clone(),
            record: record.clone(),
        });
        Ok(page_id)
    }

    async fn query(&self, query: &RecordQuery) -> Result<Vec<StoredRecord>, CoreError> {
        let records = self.records.read().await;
        let mut matching: Vec<StoredRecord> = records
            .iter()
            .filter(|stored| query.matches(&stored.record))
            .cloned()
            .collect();

        // Stable sort keeps insertion order among equal timestamps
        matching.sort_by(|a, b| b.record.created_at.cmp(&a.record.created_at));
        if query.limit > 0 {
            matching.truncate(query.limit);
        }
        Ok(matching)
    }

    async fn update_status(&self, page_id: &PageId, status: RecordStatus) -> Result<(), CoreError> {
        let mut records = self.records.write().await;
        let stored = records
            .iter_mut()
            .find(|stored| &stored.page_id == page_id)
            .ok_or_else(|| StoreError::RecordNotFound {
                page_id: page_id.to_string(),
            })?;
        stored.record.status = status;
        Ok(())
    }
}
