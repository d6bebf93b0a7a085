//! Integration tests for the full issuance pipeline.
//!
//! Tests: submission → queue → worker pool → handlers → store
//!
//! Verifies:
//! - concurrent workers drain a bulk submission and the batch counters land
//!   exactly on total_count
//! - the send_email chain produces one dispatched mail per certificate
//! - renderer failures drive both the certificates and the batch to their
//!   failed terminal states

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use certmill_domain::{BatchStatus, EmailTemplate, Template, TemplateConfig};
    use certmill_queue::{
        Dispatcher, InMemoryJobQueue, JobType, WorkerPool, WorkerPoolConfig, WorkerPoolHandle,
    };

    use crate::handlers::testing::{FakeArtifacts, FakeRenderer, FakeTransport};
    use crate::handlers::{GenerateCertificateHandler, SendEmailHandler};
    use crate::service::{BulkGenerateRequest, CertificateService, RecipientInput};
    use crate::store::{EntityStore, InMemoryEntityStore};

    struct Pipeline {
        store: Arc<InMemoryEntityStore>,
        queue: Arc<InMemoryJobQueue>,
        transport: Arc<FakeTransport>,
        service: CertificateService,
    }

    fn pipeline() -> Pipeline {
        let store = Arc::new(InMemoryEntityStore::new());
        let queue = Arc::new(InMemoryJobQueue::new());
        let transport = Arc::new(FakeTransport::ok());
        let service = CertificateService::new(store.clone(), queue.clone());
        Pipeline {
            store,
            queue,
            transport,
            service,
        }
    }

    fn spawn_workers(p: &Pipeline, renderer: FakeRenderer) -> WorkerPoolHandle {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(
            JobType::GenerateCertificate,
            Arc::new(GenerateCertificateHandler::new(
                p.store.clone(),
                Arc::new(renderer),
                Arc::new(FakeArtifacts::ok()),
                p.queue.clone(),
            )),
        );
        dispatcher.register(
            JobType::SendEmail,
            Arc::new(SendEmailHandler::new(p.store.clone(), p.transport.clone())),
        );

        WorkerPool::spawn(
            p.queue.clone(),
            Arc::new(dispatcher),
            WorkerPoolConfig::default()
                .with_workers(3)
                .with_claim_timeout(Duration::from_millis(20)),
        )
    }

    fn seed_template(store: &InMemoryEntityStore) -> Template {
        let template = Template::new("plain", "", TemplateConfig::default());
        store.insert_template(&template).unwrap();
        template
    }

    fn recipients(n: usize) -> Vec<RecipientInput> {
        (0..n)
            .map(|i| RecipientInput {
                name: format!("R{i}"),
                email: format!("r{i}@example.org"),
                ..RecipientInput::default()
            })
            .collect()
    }

    fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) {
        let limit = Instant::now() + deadline;
        while !done() {
            assert!(Instant::now() < limit, "pipeline did not settle in time");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn bulk_submission_drains_to_completed_batch() {
        let p = pipeline();
        let template = seed_template(&p.store);

        let batch = p
            .service
            .bulk_generate(BulkGenerateRequest {
                template_id: template.id,
                recipients: recipients(5),
                send_email: false,
                email_template_id: None,
            })
            .unwrap();

        let pool = spawn_workers(&p, FakeRenderer::ok());
        wait_until(Duration::from_secs(5), || {
            p.store
                .batch(batch.id)
                .unwrap()
                .map(|b| b.is_terminal())
                .unwrap_or(false)
        });
        pool.shutdown();

        let batch = p.store.batch(batch.id).unwrap().unwrap();
        assert_eq!(batch.processed, 5);
        assert_eq!(batch.failed, 0);
        assert_eq!(batch.status, BatchStatus::Completed);
    }

    #[test]
    fn send_email_chain_delivers_one_mail_per_certificate() {
        let p = pipeline();
        let template = seed_template(&p.store);
        p.store
            .insert_email_template(&EmailTemplate::new(
                "default",
                "Certificate for {{name}}",
                "<p>{{download_url}}</p>",
            ))
            .unwrap();

        let batch = p
            .service
            .bulk_generate(BulkGenerateRequest {
                template_id: template.id,
                recipients: recipients(3),
                send_email: true,
                email_template_id: None,
            })
            .unwrap();

        let pool = spawn_workers(&p, FakeRenderer::ok());
        wait_until(Duration::from_secs(5), || {
            p.transport.sent_count() == 3 && p.queue.is_empty()
        });
        pool.shutdown();

        let batch = p.store.batch(batch.id).unwrap().unwrap();
        assert_eq!(batch.processed, 3);
        assert_eq!(batch.status, BatchStatus::Completed);
    }

    #[test]
    fn renderer_failures_count_as_batch_failures() {
        let p = pipeline();
        let template = seed_template(&p.store);

        let batch = p
            .service
            .bulk_generate(BulkGenerateRequest {
                template_id: template.id,
                recipients: recipients(2),
                send_email: false,
                email_template_id: None,
            })
            .unwrap();

        let pool = spawn_workers(&p, FakeRenderer::failing());
        wait_until(Duration::from_secs(5), || {
            p.store
                .batch(batch.id)
                .unwrap()
                .map(|b| b.is_terminal())
                .unwrap_or(false)
        });
        pool.shutdown();

        let batch = p.store.batch(batch.id).unwrap().unwrap();
        assert_eq!(batch.processed, 0);
        assert_eq!(batch.failed, 2);
        assert_eq!(batch.status, BatchStatus::Failed);
    }
}
