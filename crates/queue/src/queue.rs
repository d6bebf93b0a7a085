//! Queue abstraction and the in-memory implementation.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::warn;

use crate::job::JobEnvelope;

/// Queue transport error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueueError {
    #[error("queue connection error: {0}")]
    Connection(String),

    #[error("queue command error: {0}")]
    Command(String),

    #[error("job serialization error: {0}")]
    Serialization(String),
}

/// Durable FIFO handoff between producers and workers.
///
/// `claim` is destructive: a returned job is no longer visible to any other
/// worker. Arrival order is preserved where the backend allows, but consumers
/// must not rely on it.
pub trait JobQueue: Send + Sync {
    /// Append a job; returns once the backing store acknowledged the write.
    fn enqueue(&self, job: &JobEnvelope) -> Result<(), QueueError>;

    /// Append a sequence of jobs, best-effort per item: an item that fails to
    /// serialize is logged and skipped without blocking the rest.
    fn enqueue_batch(&self, jobs: &[JobEnvelope]) -> Result<(), QueueError>;

    /// Block up to `timeout` for the next job. `Ok(None)` means nothing
    /// arrived — not an error. A payload that cannot be decoded is logged and
    /// dropped (poison-pill protection) and also surfaces as `Ok(None)`.
    fn claim(&self, timeout: Duration) -> Result<Option<JobEnvelope>, QueueError>;
}

/// Decode a claimed payload, dropping undecodable ones.
pub(crate) fn decode_claimed(raw: &str) -> Option<JobEnvelope> {
    match serde_json::from_str::<JobEnvelope>(raw) {
        Ok(job) => Some(job),
        Err(err) => {
            warn!(error = %err, payload_len = raw.len(), "dropping undecodable job payload");
            None
        }
    }
}

/// In-memory queue for tests and single-process deployments.
///
/// Payloads are stored serialized so this path exercises the same wire codec
/// as the Redis backend.
#[derive(Debug, Default)]
pub struct InMemoryJobQueue {
    inner: Mutex<VecDeque<String>>,
    available: Condvar,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an already-serialized payload, as a foreign producer would.
    pub fn push_raw(&self, raw: impl Into<String>) {
        self.inner.lock().unwrap().push_back(raw.into());
        self.available.notify_one();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl JobQueue for InMemoryJobQueue {
    fn enqueue(&self, job: &JobEnvelope) -> Result<(), QueueError> {
        let payload =
            serde_json::to_string(job).map_err(|e| QueueError::Serialization(e.to_string()))?;
        self.push_raw(payload);
        Ok(())
    }

    fn enqueue_batch(&self, jobs: &[JobEnvelope]) -> Result<(), QueueError> {
        for job in jobs {
            match serde_json::to_string(job) {
                Ok(payload) => self.push_raw(payload),
                Err(err) => {
                    warn!(job_id = %job.id, error = %err, "skipping unserializable job in batch");
                }
            }
        }
        Ok(())
    }

    fn claim(&self, timeout: Duration) -> Result<Option<JobEnvelope>, QueueError> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.inner.lock().unwrap();

        loop {
            if let Some(raw) = queue.pop_front() {
                return Ok(decode_claimed(&raw));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let (guard, wait) = self
                .available
                .wait_timeout(queue, deadline - now)
                .unwrap();
            queue = guard;
            if wait.timed_out() && queue.is_empty() {
                return Ok(None);
            }
        }
    }
}
