//! Where results go: the document store that receives generated records, and
//! the registry of post ids already surfaced.

pub mod memory;
pub mod notion;
pub mod seen;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use outreach_core::{ContentRecord, CoreError, PageId, RecordStatus, RecordType, StoredRecord};

pub use memory::InMemoryDocumentStore;
pub use notion::NotionStore;
pub use seen::{InMemorySeenRegistry, SeenRegistry, SqliteSeenRegistry};

/// Filter for [`DocumentStore::query`]. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordQuery {
    pub record_type: Option<RecordType>,
    pub status: Option<RecordStatus>,
    pub limit: usize,
}

impl RecordQuery {
    pub fn new(record_type: RecordType, status: RecordStatus, limit: usize) -> Self {
        Self {
            record_type: Some(record_type),
            status: Some(status),
            limit,
        }
    }

    pub fn matches(&self, record: &ContentRecord) -> bool {
        self.record_type.map_or(true, |t| record.record_type == t)
            && self.status.map_or(true, |s| record.status == s)
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn name(&self) -> &str;

    async fn create(&self, record: &ContentRecord) -> Result<PageId, CoreError>;

    /// Newest first, at most `query.limit` records.
    async fn query(&self, query: &RecordQuery) -> Result<Vec<StoredRecord>, CoreError>;

    /// Setting the status a record already has is a no-op.
    async fn update_status(&self, page_id: &PageId, status: RecordStatus) -> Result<(), CoreError>;
}
