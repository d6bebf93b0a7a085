//! Worker pool: N independent claim loops dispatching to registered handlers.

use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::job::{JobEnvelope, JobType};
use crate::queue::JobQueue;

/// Terminal failure reported by a job handler.
///
/// Handlers own their failure handling (status transitions, batch reports);
/// what reaches the worker loop is only logged — never retried or requeued.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A registered consumer for one job type.
pub trait JobHandler: Send + Sync {
    fn handle(&self, job: &JobEnvelope) -> Result<(), HandlerError>;
}

/// Dispatch failure.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No handler registered for the job's type. Terminal: logged, dropped.
    #[error("no handler registered for job type {0}")]
    UnknownType(JobType),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// Static job-type → handler table, built once at startup.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<JobType, Arc<dyn JobHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for a job type, replacing any previous one.
    pub fn register(&mut self, job_type: JobType, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(job_type, handler);
    }

    /// Route a claimed job to its handler.
    pub fn dispatch(&self, job: &JobEnvelope) -> Result<(), DispatchError> {
        let job_type = job.kind.job_type();
        let handler = self
            .handlers
            .get(&job_type)
            .ok_or(DispatchError::UnknownType(job_type))?;
        handler.handle(job)?;
        Ok(())
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of consumer loops.
    pub workers: usize,
    /// How long a single claim blocks waiting for work.
    pub claim_timeout: Duration,
    /// Pause after a queue-transport error (not after handler errors).
    pub error_backoff: Duration,
    /// Thread-name prefix for logging.
    pub name: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            claim_timeout: Duration::from_secs(5),
            error_backoff: Duration::from_secs(1),
            name: "certmill-worker".to_string(),
        }
    }
}

impl WorkerPoolConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_claim_timeout(mut self, timeout: Duration) -> Self {
        self.claim_timeout = timeout;
        self
    }
}

/// Pool runtime statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PoolStats {
    pub jobs_processed: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
}

/// Handle to one worker thread.
#[derive(Debug)]
struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

/// Handle to control a running pool.
#[derive(Debug)]
pub struct WorkerPoolHandle {
    workers: Vec<WorkerHandle>,
    stats: Arc<Mutex<PoolStats>>,
}

impl WorkerPoolHandle {
    /// Request shutdown and wait for every loop to stop. Loops finish their
    /// in-flight claim/handler call; queued work stays queued.
    pub fn shutdown(mut self) {
        for worker in &self.workers {
            let _ = worker.shutdown.send(());
        }
        for worker in &mut self.workers {
            if let Some(join) = worker.join.take() {
                let _ = join.join();
            }
        }
    }

    pub fn stats(&self) -> PoolStats {
        self.stats.lock().unwrap().clone()
    }
}

/// Fixed-size pool of independent consumer loops.
pub struct WorkerPool;

impl WorkerPool {
    /// Spawn `config.workers` named threads, each running a claim loop
    /// against `queue` and dispatching through `dispatcher`.
    pub fn spawn(
        queue: Arc<dyn JobQueue>,
        dispatcher: Arc<Dispatcher>,
        config: WorkerPoolConfig,
    ) -> WorkerPoolHandle {
        let stats = Arc::new(Mutex::new(PoolStats::default()));
        let mut workers = Vec::with_capacity(config.workers);

        for index in 0..config.workers {
            let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
            let name = format!("{}-{}", config.name, index + 1);

            let queue = queue.clone();
            let dispatcher = dispatcher.clone();
            let stats = stats.clone();
            let loop_config = config.clone();

            let join = thread::Builder::new()
                .name(name.clone())
                .spawn(move || {
                    worker_loop(&name, queue, dispatcher, shutdown_rx, loop_config, stats);
                })
                .expect("failed to spawn worker thread");

            workers.push(WorkerHandle {
                shutdown: shutdown_tx,
                join: Some(join),
            });
        }

        WorkerPoolHandle { workers, stats }
    }
}

fn worker_loop(
    name: &str,
    queue: Arc<dyn JobQueue>,
    dispatcher: Arc<Dispatcher>,
    shutdown_rx: mpsc::Receiver<()>,
    config: WorkerPoolConfig,
    stats: Arc<Mutex<PoolStats>>,
) {
    info!(worker = name, "worker started");

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match queue.claim(config.claim_timeout) {
            Ok(Some(job)) => {
                debug!(worker = name, job_id = %job.id, job_type = %job.kind.job_type(), "claimed job");

                let result = dispatcher.dispatch(&job);

                {
                    let mut s = stats.lock().unwrap();
                    s.jobs_processed += 1;
                    if result.is_ok() {
                        s.jobs_succeeded += 1;
                    } else {
                        s.jobs_failed += 1;
                    }
                }

                match result {
                    Ok(()) => {
                        debug!(worker = name, job_id = %job.id, "job completed");
                    }
                    Err(DispatchError::UnknownType(job_type)) => {
                        warn!(worker = name, job_id = %job.id, %job_type, "no handler for job type; dropping");
                    }
                    Err(DispatchError::Handler(err)) => {
                        warn!(worker = name, job_id = %job.id, error = %err, "job handler failed");
                    }
                }
            }
            Ok(None) => {
                // Empty claim: the claim itself carried the wait, retry
                // immediately.
                continue;
            }
            Err(err) => {
                error!(worker = name, error = %err, "failed to claim job");
                thread::sleep(config.error_backoff);
            }
        }
    }

    info!(worker = name, "worker stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use certmill_core::CertificateId;

    use super::*;
    use crate::job::{GenerateCertificateJob, JobKind, SendEmailJob};
    use crate::queue::InMemoryJobQueue;

    struct CountingHandler {
        calls: AtomicU64,
        fail: bool,
    }

    impl CountingHandler {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU64::new(0),
                fail,
            })
        }
    }

    impl JobHandler for CountingHandler {
        fn handle(&self, _job: &JobEnvelope) -> Result<(), HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(HandlerError::new("boom"))
            } else {
                Ok(())
            }
        }
    }

    fn generation_job(id: &str) -> JobEnvelope {
        JobEnvelope::new(
            id,
            JobKind::GenerateCertificate(GenerateCertificateJob {
                certificate_id: CertificateId::new(),
                batch_id: None,
                send_email: false,
                email_template_id: None,
            }),
        )
    }

    fn email_job(id: &str) -> JobEnvelope {
        JobEnvelope::new(
            id,
            JobKind::SendEmail(SendEmailJob {
                certificate_id: CertificateId::new(),
                email_template_id: None,
            }),
        )
    }

    fn wait_for(stats: &WorkerPoolHandle, processed: u64) {
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while stats.stats().jobs_processed < processed {
            assert!(
                std::time::Instant::now() < deadline,
                "pool did not process {processed} jobs in time"
            );
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn test_config(workers: usize) -> WorkerPoolConfig {
        WorkerPoolConfig::default()
            .with_workers(workers)
            .with_claim_timeout(Duration::from_millis(20))
    }

    #[test]
    fn dispatches_by_job_type() {
        let queue = Arc::new(InMemoryJobQueue::new());
        let generate = CountingHandler::new(false);
        let email = CountingHandler::new(false);

        let mut dispatcher = Dispatcher::new();
        dispatcher.register(JobType::GenerateCertificate, generate.clone());
        dispatcher.register(JobType::SendEmail, email.clone());

        queue.enqueue(&generation_job("g1")).unwrap();
        queue.enqueue(&generation_job("g2")).unwrap();
        queue.enqueue(&email_job("e1")).unwrap();

        let pool = WorkerPool::spawn(queue.clone(), Arc::new(dispatcher), test_config(2));
        wait_for(&pool, 3);
        pool.shutdown();

        assert_eq!(generate.calls.load(Ordering::SeqCst), 2);
        assert_eq!(email.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_error_does_not_stop_the_loop() {
        let queue = Arc::new(InMemoryJobQueue::new());
        let failing = CountingHandler::new(true);

        let mut dispatcher = Dispatcher::new();
        dispatcher.register(JobType::GenerateCertificate, failing.clone());

        queue.enqueue(&generation_job("bad1")).unwrap();
        queue.enqueue(&generation_job("bad2")).unwrap();

        let pool = WorkerPool::spawn(queue.clone(), Arc::new(dispatcher), test_config(1));
        wait_for(&pool, 2);
        let stats = pool.stats();
        pool.shutdown();

        assert_eq!(failing.calls.load(Ordering::SeqCst), 2);
        assert_eq!(stats.jobs_failed, 2);
        assert!(queue.is_empty(), "failed jobs must not be requeued");
    }

    #[test]
    fn unregistered_type_is_dropped() {
        let queue = Arc::new(InMemoryJobQueue::new());
        let generate = CountingHandler::new(false);

        // Only the generation handler is registered.
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(JobType::GenerateCertificate, generate.clone());

        queue.enqueue(&email_job("orphan")).unwrap();
        queue.enqueue(&generation_job("ok")).unwrap();

        let pool = WorkerPool::spawn(queue.clone(), Arc::new(dispatcher), test_config(1));
        wait_for(&pool, 2);
        let stats = pool.stats();
        pool.shutdown();

        assert_eq!(stats.jobs_failed, 1);
        assert_eq!(generate.calls.load(Ordering::SeqCst), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn shutdown_stops_idle_workers() {
        let queue = Arc::new(InMemoryJobQueue::new());
        let dispatcher = Arc::new(Dispatcher::new());

        let pool = WorkerPool::spawn(queue, dispatcher, test_config(3));
        // Workers are blocked in claim; shutdown must still return promptly.
        pool.shutdown();
    }
}
