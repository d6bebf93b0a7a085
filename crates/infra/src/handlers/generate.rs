//! Certificate generation orchestrator (the `generate_certificate` handler).

use std::sync::Arc;

use tracing::{debug, warn};

use certmill_core::{CertificateId, RecipientId, TemplateId};
use certmill_domain::Certificate;
use certmill_queue::{
    GenerateCertificateJob, HandlerError, JobEnvelope, JobHandler, JobKind, JobQueue, SendEmailJob,
};

use crate::handlers::batch::BatchAggregator;
use crate::render::fields::{resolve_fields, DEFAULT_TEMPLATE_NAME};
use crate::render::{CertificateRenderer, RenderError};
use crate::storage::{ArtifactStore, StorageError};
use crate::store::{EntityStore, StoreError};

/// Storage-path event label used when the recipient names no event.
pub const DEFAULT_EVENT: &str = "default";

/// Generation failure. Everything here is terminal for the job; retry, if
/// any, is an external re-enqueue made safe by the idempotent no-op on
/// terminal certificates.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("unexpected payload for generation job")]
    UnexpectedPayload,

    #[error("certificate not found: {0}")]
    CertificateNotFound(CertificateId),

    #[error("template not found: {0}")]
    TemplateNotFound(TemplateId),

    #[error("recipient not found: {0}")]
    RecipientNotFound(RecipientId),

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("artifact storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Owns every certificate status transition: loads the entities, renders and
/// stores the artifact, persists the outcome, reports to the batch, and
/// chains the email job.
pub struct GenerateCertificateHandler {
    store: Arc<dyn EntityStore>,
    renderer: Arc<dyn CertificateRenderer>,
    artifacts: Arc<dyn ArtifactStore>,
    queue: Arc<dyn JobQueue>,
    batches: BatchAggregator,
}

impl GenerateCertificateHandler {
    pub fn new(
        store: Arc<dyn EntityStore>,
        renderer: Arc<dyn CertificateRenderer>,
        artifacts: Arc<dyn ArtifactStore>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        let batches = BatchAggregator::new(store.clone());
        Self {
            store,
            renderer,
            artifacts,
            queue,
            batches,
        }
    }

    fn process(&self, job: &JobEnvelope) -> Result<(), GenerateError> {
        let JobKind::GenerateCertificate(payload) = &job.kind else {
            return Err(GenerateError::UnexpectedPayload);
        };

        let mut certificate = self
            .store
            .certificate(payload.certificate_id)?
            .ok_or(GenerateError::CertificateNotFound(payload.certificate_id))?;

        // Re-delivered job for a finished certificate: successful no-op, no
        // re-render, no second batch report.
        if certificate.is_terminal() {
            debug!(
                certificate_id = %certificate.id,
                status = %certificate.status,
                "certificate already terminal; skipping"
            );
            return Ok(());
        }

        let template = self
            .store
            .template(certificate.template_id)?
            .ok_or(GenerateError::TemplateNotFound(certificate.template_id))?;
        let recipient = self
            .store
            .recipient(certificate.recipient_id)?
            .ok_or(GenerateError::RecipientNotFound(certificate.recipient_id))?;

        let fields = resolve_fields(&recipient, &template.config);
        let template_name = template
            .config
            .template_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_TEMPLATE_NAME);

        let rendered = match self.renderer.render(template_name, &fields) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.fail(&mut certificate, payload);
                return Err(err.into());
            }
        };

        let event = if recipient.event.is_empty() {
            DEFAULT_EVENT
        } else {
            &recipient.event
        };
        let file_path =
            match self
                .artifacts
                .save(&rendered, event, &recipient.name, &recipient.email)
            {
                Ok(path) => path,
                Err(err) => {
                    self.fail(&mut certificate, payload);
                    return Err(err.into());
                }
            };

        certificate.mark_completed(file_path);
        self.store.update_certificate(&certificate)?;

        if payload.send_email {
            let email_job = JobEnvelope::new(
                format!("email-{}", certificate.id),
                JobKind::SendEmail(SendEmailJob {
                    certificate_id: certificate.id,
                    email_template_id: payload.email_template_id,
                }),
            );
            // Generation already succeeded; a lost email job must not change
            // its outcome.
            if let Err(err) = self.queue.enqueue(&email_job) {
                warn!(
                    certificate_id = %certificate.id,
                    error = %err,
                    "failed to enqueue email job"
                );
            }
        }

        self.batches.report_success(payload.batch_id);
        Ok(())
    }

    fn fail(&self, certificate: &mut Certificate, payload: &GenerateCertificateJob) {
        certificate.mark_failed();
        if let Err(err) = self.store.update_certificate(certificate) {
            warn!(
                certificate_id = %certificate.id,
                error = %err,
                "failed to persist failed certificate status"
            );
        }
        self.batches.report_failure(payload.batch_id);
    }
}

impl JobHandler for GenerateCertificateHandler {
    fn handle(&self, job: &JobEnvelope) -> Result<(), HandlerError> {
        self.process(job).map_err(|e| HandlerError::new(e.to_string()))
    }
}
