//! `certmill-queue` — durable job handoff between the API and the workers.
//!
//! ## Components
//!
//! - `JobEnvelope`: the unit of queued work, with a discriminated typed
//!   payload decoded once at claim time
//! - `JobQueue`: durable append / blocking destructive claim, in-memory and
//!   Redis-backed
//! - `Dispatcher`: static job-type → handler table built at startup
//! - `WorkerPool`: fixed-size pool of independent claim loops

pub mod job;
pub mod queue;
#[cfg(feature = "redis")]
pub mod redis;
pub mod worker;

pub use job::{GenerateCertificateJob, JobEnvelope, JobKind, JobType, SendEmailJob};
pub use queue::{InMemoryJobQueue, JobQueue, QueueError};
#[cfg(feature = "redis")]
pub use redis::RedisJobQueue;
pub use worker::{
    Dispatcher, DispatchError, HandlerError, JobHandler, PoolStats, WorkerPool, WorkerPoolConfig,
    WorkerPoolHandle,
};
