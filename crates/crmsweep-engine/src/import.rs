use crate::error::{EngineError, Result};
use crmsweep_client::CrmClient;
use crmsweep_core::{time, BatchId, RecordKind};
use crmsweep_store::repo::BatchStatus;
use crmsweep_store::Store;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub batch_id: BatchId,
    pub kind: RecordKind,
    pub pages: usize,
    pub total: i64,
    pub imported: i64,
    pub failed: i64,
}

/// Pulls every page of a kind from the CRM within one run and upserts the
/// records. Per-record failures are counted and skipped; a failed page
/// fetch aborts the run with the batch marked failed.
pub fn run_import(store: &Store, client: &dyn CrmClient, kind: RecordKind) -> Result<ImportSummary> {
    let batch = store.import_batches().start(time::now_ms(), kind)?;
    let mut summary = ImportSummary {
        batch_id: batch.id,
        kind,
        pages: 0,
        total: 0,
        imported: 0,
        failed: 0,
    };

    for page in client.fetch_all(kind) {
        let page = match page {
            Ok(page) => page,
            Err(err) => {
                store
                    .import_batches()
                    .finish(time::now_ms(), batch.id, BatchStatus::Failed)?;
                return Err(EngineError::external(err));
            }
        };
        for record in &page {
            summary.total += 1;
            match store.records().upsert(record) {
                Ok(()) => summary.imported += 1,
                Err(err) => {
                    warn!(
                        external_id = record.external_id(),
                        error = %err,
                        "skipping record that failed to import"
                    );
                    summary.failed += 1;
                }
            }
        }
        summary.pages += 1;
        store
            .import_batches()
            .update_counts(batch.id, summary.total, summary.imported, summary.failed)?;
    }

    let status = if summary.failed > 0 && summary.imported == 0 && summary.total > 0 {
        BatchStatus::Failed
    } else {
        BatchStatus::Completed
    };
    store
        .import_batches()
        .finish(time::now_ms(), batch.id, status)?;
    debug!(
        kind = %kind,
        pages = summary.pages,
        imported = summary.imported,
        failed = summary.failed,
        "import complete"
    );
    Ok(summary)
}
