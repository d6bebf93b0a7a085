//! Runtime wiring: store, queue, renderer, transport, handlers, workers.

use std::sync::Arc;

use tracing::{info, warn};

use certmill_infra::config::Config;
use certmill_infra::email::{EmailTransport, SmtpMailer};
use certmill_infra::handlers::{GenerateCertificateHandler, SendEmailHandler};
use certmill_infra::render::{CertificateRenderer, HtmlRenderer, PdfEngine};
use certmill_infra::service::CertificateService;
use certmill_infra::storage::{ArtifactStore, LocalStorage};
use certmill_infra::store::{EntityStore, InMemoryEntityStore, PostgresEntityStore};
use certmill_queue::{
    Dispatcher, InMemoryJobQueue, JobQueue, JobType, WorkerPool, WorkerPoolConfig, WorkerPoolHandle,
};

/// Shared state behind every route.
pub struct AppContext {
    pub service: CertificateService,
    pub store: Arc<dyn EntityStore>,
    pub artifacts: Arc<dyn ArtifactStore>,
}

/// The assembled process: HTTP state plus the running worker pool.
pub struct Runtime {
    pub ctx: Arc<AppContext>,
    pub workers: WorkerPoolHandle,
}

/// Wire the whole pipeline from configuration: pick the store and queue
/// backends, register both job handlers, and start the worker pool.
pub async fn build_runtime(config: &Config) -> anyhow::Result<Runtime> {
    let store: Arc<dyn EntityStore> = match &config.database_url {
        Some(url) => Arc::new(PostgresEntityStore::connect(url).await?),
        None => {
            warn!("DATABASE_URL not set; using in-memory store");
            Arc::new(InMemoryEntityStore::new())
        }
    };

    let queue = build_queue(config)?;

    let renderer: Arc<dyn CertificateRenderer> = Arc::new(HtmlRenderer::new(
        config.render.templates_dir.clone(),
        build_engine()?,
    ));
    let artifacts: Arc<dyn ArtifactStore> =
        Arc::new(LocalStorage::new(config.storage.root.clone())?);
    let transport: Arc<dyn EmailTransport> = Arc::new(SmtpMailer::new(&config.email)?);

    let mut dispatcher = Dispatcher::new();
    dispatcher.register(
        JobType::GenerateCertificate,
        Arc::new(GenerateCertificateHandler::new(
            store.clone(),
            renderer,
            artifacts.clone(),
            queue.clone(),
        )),
    );
    dispatcher.register(
        JobType::SendEmail,
        Arc::new(SendEmailHandler::new(store.clone(), transport)),
    );

    let workers = WorkerPool::spawn(
        queue.clone(),
        Arc::new(dispatcher),
        WorkerPoolConfig::default()
            .with_workers(config.workers.count)
            .with_claim_timeout(config.workers.claim_timeout),
    );
    info!(workers = config.workers.count, "worker pool started");

    let service = CertificateService::new(store.clone(), queue);

    Ok(Runtime {
        ctx: Arc::new(AppContext {
            service,
            store,
            artifacts,
        }),
        workers,
    })
}

#[cfg(feature = "redis")]
fn build_queue(config: &Config) -> anyhow::Result<Arc<dyn JobQueue>> {
    match &config.redis.url {
        Some(url) => {
            let queue =
                certmill_queue::RedisJobQueue::new(url, Some(config.redis.queue_key.clone()))?;
            Ok(Arc::new(queue))
        }
        None => {
            warn!("REDIS_URL not set; using in-memory queue");
            Ok(Arc::new(InMemoryJobQueue::new()))
        }
    }
}

#[cfg(not(feature = "redis"))]
fn build_queue(config: &Config) -> anyhow::Result<Arc<dyn JobQueue>> {
    if config.redis.url.is_some() {
        warn!("REDIS_URL set but the binary was built without the `redis` feature; using in-memory queue");
    }
    Ok(Arc::new(InMemoryJobQueue::new()))
}

#[cfg(feature = "chromium")]
fn build_engine() -> anyhow::Result<Arc<dyn PdfEngine>> {
    Ok(Arc::new(certmill_infra::render::ChromiumEngine::launch()?))
}

#[cfg(not(feature = "chromium"))]
fn build_engine() -> anyhow::Result<Arc<dyn PdfEngine>> {
    warn!("built without the `chromium` feature; artifacts will be raw HTML");
    Ok(Arc::new(certmill_infra::render::PassthroughEngine))
}
