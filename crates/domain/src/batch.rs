use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use certmill_core::{BatchId, TemplateId};

/// Aggregate status of a bulk submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Processing,
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        }
    }
}

impl core::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress aggregate for a group of generation jobs submitted together.
///
/// Counter invariants, maintained by `record_success`/`record_failure`:
/// - `processed + failed` never exceeds `total_count`
/// - each counter only ever increases
/// - status is `Failed` iff every job failed, `Completed` once all jobs are
///   accounted for and at least one succeeded, `Processing` otherwise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateBatch {
    pub id: BatchId,
    pub template_id: TemplateId,
    pub total_count: u32,
    pub processed: u32,
    pub failed: u32,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CertificateBatch {
    pub fn new(template_id: TemplateId, total_count: u32) -> Self {
        let now = Utc::now();
        Self {
            id: BatchId::new(),
            template_id,
            total_count,
            processed: 0,
            failed: 0,
            status: BatchStatus::Processing,
            created_at: now,
            updated_at: now,
        }
    }

    fn accounted(&self) -> u32 {
        self.processed + self.failed
    }

    /// Count one successful generation job. Saturates once every job is
    /// accounted for, so a duplicate report cannot push counters past
    /// `total_count`.
    pub fn record_success(&mut self) {
        if self.accounted() >= self.total_count {
            return;
        }
        self.processed += 1;
        self.recompute_status();
        self.updated_at = Utc::now();
    }

    /// Count one terminally failed generation job. Same saturation rule as
    /// `record_success`.
    pub fn record_failure(&mut self) {
        if self.accounted() >= self.total_count {
            return;
        }
        self.failed += 1;
        self.recompute_status();
        self.updated_at = Utc::now();
    }

    fn recompute_status(&mut self) {
        if self.accounted() >= self.total_count {
            self.status = if self.failed == self.total_count {
                BatchStatus::Failed
            } else {
                BatchStatus::Completed
            };
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, BatchStatus::Completed | BatchStatus::Failed)
    }

    /// Percentage of successfully processed jobs; `0` for an empty batch.
    pub fn progress(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        f64::from(self.processed) / f64::from(self.total_count) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn batch(total: u32) -> CertificateBatch {
        CertificateBatch::new(TemplateId::new(), total)
    }

    #[test]
    fn partial_failure_completes() {
        let mut b = batch(3);
        b.record_success();
        b.record_failure();
        assert_eq!(b.status, BatchStatus::Processing);
        b.record_success();
        assert_eq!(b.processed, 2);
        assert_eq!(b.failed, 1);
        assert_eq!(b.status, BatchStatus::Completed);
    }

    #[test]
    fn all_failures_fail_the_batch() {
        let mut b = batch(2);
        b.record_failure();
        assert_eq!(b.status, BatchStatus::Processing);
        b.record_failure();
        assert_eq!(b.status, BatchStatus::Failed);
        assert_eq!(b.processed, 0);
        assert_eq!(b.failed, 2);
    }

    #[test]
    fn duplicate_reports_saturate() {
        let mut b = batch(1);
        b.record_success();
        let snapshot = (b.processed, b.failed, b.status);
        b.record_success();
        b.record_failure();
        assert_eq!((b.processed, b.failed, b.status), snapshot);
    }

    #[test]
    fn progress_is_zero_for_empty_batch() {
        assert_eq!(batch(0).progress(), 0.0);
        let mut b = batch(4);
        b.record_success();
        assert_eq!(b.progress(), 25.0);
    }

    proptest! {
        /// Any interleaving of reports keeps counters inside the bounds and
        /// derives status exactly from the counters.
        #[test]
        fn counters_stay_bounded(total in 0u32..20, reports in proptest::collection::vec(any::<bool>(), 0..64)) {
            let mut b = batch(total);
            for success in reports {
                if success {
                    b.record_success();
                } else {
                    b.record_failure();
                }
                prop_assert!(b.processed <= b.total_count);
                prop_assert!(b.failed <= b.total_count);
                prop_assert!(b.processed + b.failed <= b.total_count);

                let expected = if b.processed + b.failed == b.total_count {
                    if b.failed == b.total_count && b.total_count > 0 {
                        BatchStatus::Failed
                    } else if b.total_count > 0 {
                        BatchStatus::Completed
                    } else {
                        BatchStatus::Processing
                    }
                } else {
                    BatchStatus::Processing
                };
                prop_assert_eq!(b.status, expected);
            }
        }
    }
}
