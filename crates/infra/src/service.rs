//! Submission service: maps API requests to persisted entities and queued
//! jobs, and serves the lookups the API layer exposes.

use std::sync::Arc;

use tracing::warn;

use certmill_core::{BatchId, CertificateId, EmailTemplateId, TemplateId};
use certmill_domain::{Certificate, CertificateBatch, Recipient};
use certmill_queue::{
    GenerateCertificateJob, JobEnvelope, JobKind, JobQueue, QueueError,
};

use crate::store::{EntityStore, StoreError};

/// Recipient data as submitted by a caller.
#[derive(Debug, Clone, Default)]
pub struct RecipientInput {
    pub name: String,
    pub email: String,
    pub course: String,
    pub event: String,
    pub club: String,
    pub date: String,
    pub student_id: String,
    pub metadata: std::collections::BTreeMap<String, String>,
}

impl RecipientInput {
    fn into_recipient(self) -> Recipient {
        let mut recipient = Recipient::new(self.name, self.email);
        recipient.course = self.course;
        recipient.event = self.event;
        recipient.club = self.club;
        recipient.date = self.date;
        recipient.student_id = self.student_id;
        recipient.metadata = self.metadata;
        recipient
    }
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub template_id: TemplateId,
    pub recipient: RecipientInput,
    pub send_email: bool,
    pub email_template_id: Option<EmailTemplateId>,
}

#[derive(Debug, Clone)]
pub struct BulkGenerateRequest {
    pub template_id: TemplateId,
    pub recipients: Vec<RecipientInput>,
    pub send_email: bool,
    pub email_template_id: Option<EmailTemplateId>,
}

/// Submission failure.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("template not found")]
    TemplateNotFound,

    #[error("bulk request carries no recipients")]
    EmptyBatch,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Accepts submissions and enqueues the corresponding generation jobs. The
/// producer side of the pipeline: it never waits for processing.
pub struct CertificateService {
    store: Arc<dyn EntityStore>,
    queue: Arc<dyn JobQueue>,
}

impl CertificateService {
    pub fn new(store: Arc<dyn EntityStore>, queue: Arc<dyn JobQueue>) -> Self {
        Self { store, queue }
    }

    /// Submit one certificate: create the recipient and a pending
    /// certificate, then enqueue its generation job.
    pub fn generate(&self, request: GenerateRequest) -> Result<Certificate, SubmitError> {
        let template = self
            .store
            .active_template(request.template_id)?
            .ok_or(SubmitError::TemplateNotFound)?;

        let recipient = request.recipient.into_recipient();
        self.store.insert_recipient(&recipient)?;

        let certificate = Certificate::new(template.id, recipient.id);
        self.store.insert_certificate(&certificate)?;

        let job = JobEnvelope::new(
            format!("cert-{}", certificate.id),
            JobKind::GenerateCertificate(GenerateCertificateJob {
                certificate_id: certificate.id,
                batch_id: None,
                send_email: request.send_email,
                email_template_id: request.email_template_id,
            }),
        );
        self.queue.enqueue(&job)?;

        Ok(certificate)
    }

    /// Submit a batch: one pending certificate per recipient, one batch row
    /// sized to the request, one pipelined enqueue. Recipient rows that fail
    /// to persist are skipped (best-effort per item).
    pub fn bulk_generate(
        &self,
        request: BulkGenerateRequest,
    ) -> Result<CertificateBatch, SubmitError> {
        if request.recipients.is_empty() {
            return Err(SubmitError::EmptyBatch);
        }

        let template = self
            .store
            .active_template(request.template_id)?
            .ok_or(SubmitError::TemplateNotFound)?;

        let batch = CertificateBatch::new(template.id, request.recipients.len() as u32);
        self.store.insert_batch(&batch)?;

        let mut jobs = Vec::with_capacity(request.recipients.len());
        for (index, input) in request.recipients.into_iter().enumerate() {
            let recipient = input.into_recipient();
            if let Err(err) = self.store.insert_recipient(&recipient) {
                warn!(batch_id = %batch.id, index, error = %err, "skipping recipient");
                continue;
            }

            let certificate = Certificate::new(template.id, recipient.id);
            if let Err(err) = self.store.insert_certificate(&certificate) {
                warn!(batch_id = %batch.id, index, error = %err, "skipping certificate");
                continue;
            }

            jobs.push(JobEnvelope::new(
                format!("cert-{}-{}", batch.id, index),
                JobKind::GenerateCertificate(GenerateCertificateJob {
                    certificate_id: certificate.id,
                    batch_id: Some(batch.id),
                    send_email: request.send_email,
                    email_template_id: request.email_template_id,
                }),
            ));
        }

        self.queue.enqueue_batch(&jobs)?;

        Ok(batch)
    }

    pub fn certificate(&self, id: CertificateId) -> Result<Option<Certificate>, StoreError> {
        self.store.certificate(id)
    }

    pub fn batch(&self, id: BatchId) -> Result<Option<CertificateBatch>, StoreError> {
        self.store.batch(id)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use certmill_domain::{BatchStatus, CertificateStatus, Template, TemplateConfig};
    use certmill_queue::InMemoryJobQueue;

    use super::*;
    use crate::store::InMemoryEntityStore;

    struct Fixture {
        store: Arc<InMemoryEntityStore>,
        queue: Arc<InMemoryJobQueue>,
        service: CertificateService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryEntityStore::new());
        let queue = Arc::new(InMemoryJobQueue::new());
        let service = CertificateService::new(store.clone(), queue.clone());
        Fixture {
            store,
            queue,
            service,
        }
    }

    fn active_template(store: &InMemoryEntityStore) -> Template {
        let template = Template::new("plain", "", TemplateConfig::default());
        store.insert_template(&template).unwrap();
        template
    }

    fn recipient_input(name: &str) -> RecipientInput {
        RecipientInput {
            name: name.to_string(),
            email: format!("{}@example.org", name.to_lowercase()),
            ..RecipientInput::default()
        }
    }

    #[test]
    fn generate_creates_pending_certificate_and_job() {
        let f = fixture();
        let template = active_template(&f.store);

        let certificate = f
            .service
            .generate(GenerateRequest {
                template_id: template.id,
                recipient: recipient_input("Asha"),
                send_email: true,
                email_template_id: None,
            })
            .unwrap();

        assert_eq!(certificate.status, CertificateStatus::Pending);

        let job = f.queue.claim(Duration::from_millis(10)).unwrap().unwrap();
        assert_eq!(job.id, format!("cert-{}", certificate.id));
        match job.kind {
            JobKind::GenerateCertificate(payload) => {
                assert_eq!(payload.certificate_id, certificate.id);
                assert!(payload.send_email);
                assert!(payload.batch_id.is_none());
            }
            other => panic!("unexpected job kind: {other:?}"),
        }
    }

    #[test]
    fn generate_rejects_inactive_template() {
        let f = fixture();
        let mut template = Template::new("plain", "", TemplateConfig::default());
        template.is_active = false;
        f.store.insert_template(&template).unwrap();

        let err = f
            .service
            .generate(GenerateRequest {
                template_id: template.id,
                recipient: recipient_input("Asha"),
                send_email: false,
                email_template_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, SubmitError::TemplateNotFound));
        assert!(f.queue.is_empty());
    }

    #[test]
    fn bulk_generate_creates_batch_and_jobs() {
        let f = fixture();
        let template = active_template(&f.store);

        let batch = f
            .service
            .bulk_generate(BulkGenerateRequest {
                template_id: template.id,
                recipients: vec![
                    recipient_input("A"),
                    recipient_input("B"),
                    recipient_input("C"),
                ],
                send_email: false,
                email_template_id: None,
            })
            .unwrap();

        assert_eq!(batch.total_count, 3);
        assert_eq!(batch.status, BatchStatus::Processing);
        assert_eq!(f.queue.len(), 3);

        let job = f.queue.claim(Duration::from_millis(10)).unwrap().unwrap();
        assert_eq!(job.id, format!("cert-{}-0", batch.id));
        match job.kind {
            JobKind::GenerateCertificate(payload) => {
                assert_eq!(payload.batch_id, Some(batch.id));
            }
            other => panic!("unexpected job kind: {other:?}"),
        }
    }

    #[test]
    fn bulk_generate_rejects_empty_request() {
        let f = fixture();
        let template = active_template(&f.store);

        let err = f
            .service
            .bulk_generate(BulkGenerateRequest {
                template_id: template.id,
                recipients: Vec::new(),
                send_email: false,
                email_template_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, SubmitError::EmptyBatch));
    }
}
