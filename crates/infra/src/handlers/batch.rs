//! Batch progress aggregation.

use std::sync::Arc;

use tracing::warn;

use certmill_core::BatchId;

use crate::store::EntityStore;

/// Reports generation outcomes against their batch.
///
/// Each report is one atomic read-increment-write on the batch row; the
/// store's row-level consistency serializes concurrent workers. Reports are
/// best-effort: a store failure is logged and not retried.
#[derive(Clone)]
pub struct BatchAggregator {
    store: Arc<dyn EntityStore>,
}

impl BatchAggregator {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Count one successful generation job. No-op for jobs without a batch.
    pub fn report_success(&self, batch_id: Option<BatchId>) {
        let Some(batch_id) = batch_id else {
            return;
        };
        if let Err(err) = self.store.record_batch_success(batch_id) {
            warn!(%batch_id, error = %err, "failed to record batch success");
        }
    }

    /// Count one terminally failed generation job. No-op for jobs without a
    /// batch.
    pub fn report_failure(&self, batch_id: Option<BatchId>) {
        let Some(batch_id) = batch_id else {
            return;
        };
        if let Err(err) = self.store.record_batch_failure(batch_id) {
            warn!(%batch_id, error = %err, "failed to record batch failure");
        }
    }
}
