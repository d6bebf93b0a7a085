//! Redis-backed job queue (durable list, at-least-once delivery).
//!
//! Topology:
//! - a single list key per channel, producers LPUSH and workers BRPOP, so
//!   arrival order is preserved across one channel
//! - `enqueue_batch` pipelines the appends; an item that fails to serialize
//!   is skipped without aborting the pipeline

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::job::JobEnvelope;
use crate::queue::{decode_claimed, JobQueue, QueueError};

/// Default list key for the issuance channel.
const DEFAULT_QUEUE_KEY: &str = "certmill:jobs";

#[derive(Debug, Clone)]
pub struct RedisJobQueue {
    client: Arc<redis::Client>,
    queue_key: String,
}

impl RedisJobQueue {
    /// Connect a queue to `redis_url`, using `queue_key` as the channel
    /// (default: `certmill:jobs`).
    pub fn new(
        redis_url: impl AsRef<str>,
        queue_key: Option<String>,
    ) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| QueueError::Connection(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            queue_key: queue_key.unwrap_or_else(|| DEFAULT_QUEUE_KEY.to_string()),
        })
    }

    fn connection(&self) -> Result<redis::Connection, QueueError> {
        self.client
            .get_connection()
            .map_err(|e| QueueError::Connection(e.to_string()))
    }
}

impl JobQueue for RedisJobQueue {
    fn enqueue(&self, job: &JobEnvelope) -> Result<(), QueueError> {
        let payload =
            serde_json::to_string(job).map_err(|e| QueueError::Serialization(e.to_string()))?;

        let mut conn = self.connection()?;
        let _: i64 = redis::cmd("LPUSH")
            .arg(&self.queue_key)
            .arg(payload)
            .query(&mut conn)
            .map_err(|e| QueueError::Command(format!("LPUSH failed: {}", e)))?;

        Ok(())
    }

    fn enqueue_batch(&self, jobs: &[JobEnvelope]) -> Result<(), QueueError> {
        let mut pipe = redis::pipe();
        let mut queued = 0usize;
        for job in jobs {
            match serde_json::to_string(job) {
                Ok(payload) => {
                    pipe.cmd("LPUSH").arg(&self.queue_key).arg(payload).ignore();
                    queued += 1;
                }
                Err(err) => {
                    warn!(job_id = %job.id, error = %err, "skipping unserializable job in batch");
                }
            }
        }
        if queued == 0 {
            return Ok(());
        }

        let mut conn = self.connection()?;
        pipe.query::<()>(&mut conn)
            .map_err(|e| QueueError::Command(format!("pipelined LPUSH failed: {}", e)))?;

        Ok(())
    }

    fn claim(&self, timeout: Duration) -> Result<Option<JobEnvelope>, QueueError> {
        let mut conn = self.connection()?;

        // BRPOP blocks server-side; a nil reply means the timeout elapsed
        // with nothing available.
        let reply: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(&self.queue_key)
            .arg(timeout.as_secs_f64())
            .query(&mut conn)
            .map_err(|e| QueueError::Command(format!("BRPOP failed: {}", e)))?;

        match reply {
            Some((_key, raw)) => Ok(decode_claimed(&raw)),
            None => Ok(None),
        }
    }
}
