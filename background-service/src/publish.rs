use content_store::DocumentStore;
use outreach_core::{
    ContentRecord, CoreError, ErrorExt, ErrorRecovery, PageId, RecordStatus, RecoveryStrategy,
    RetryConfig, RetryExecutor, Stage,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of a batch write, aligned with the input records.
#[derive(Debug, Default)]
pub struct PublishReport {
    pub page_ids: Vec<Option<PageId>>,
    pub failed: usize,
    /// Records never attempted because the store was disabled mid-batch.
    pub skipped: usize,
    pub store_disabled: bool,
}

impl PublishReport {
    pub fn written(&self) -> usize {
        self.page_ids.iter().filter(|id| id.is_some()).count()
    }
}

/// Writes records to the document store with bounded retries.
pub struct Publisher {
    store: Arc<dyn DocumentStore>,
    retry: RetryConfig,
}

impl Publisher {
    pub fn new(store: Arc<dyn DocumentStore>, retry: RetryConfig) -> Self {
        Self { store, retry }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// One failing record never stops the batch. A credential error stops
    /// every further write in this batch.
    pub async fn publish_batch(&self, records: &[ContentRecord]) -> PublishReport {
        let executor = RetryExecutor::new(self.retry.clone());
        let mut report = PublishReport::default();

        for record in records {
            if report.store_disabled {
                report.page_ids.push(None);
                report.skipped += 1;
                continue;
            }

            match executor
                .execute("store.create", || self.store.create(record))
                .await
            {
                Ok(page_id) => report.page_ids.push(Some(page_id)),
                Err(e) => {
                    report.page_ids.push(None);
                    report.failed += 1;
                    error!(
                        store = self.store.name(),
                        title = %record.title,
                        code = %e.error_code(),
                        "Failed to persist record: {}",
                        e
                    );
                    if ErrorRecovery::determine_strategy(&e, Stage::Persist)
                        == RecoveryStrategy::DisableCollaborator
                    {
                        warn!(store = self.store.name(), "Disabling document store for the rest of this batch");
                        report.store_disabled = true;
                    }
                }
            }
        }

        let metrics = executor.get_metrics();
        info!(
            store = self.store.name(),
            written = report.written(),
            failed = report.failed,
            skipped = report.skipped,
            retries = metrics.total_retries,
            "Publish batch complete"
        );
        report
    }

    pub async fn update_status(&self, page_id: &PageId, status: RecordStatus) -> Result<(), CoreError> {
        RetryExecutor::new(self.retry.clone())
            .execute("store.update_status", || self.store.update_status(page_id, status))
            .await
    }
}
