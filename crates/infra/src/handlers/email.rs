//! Email dispatch handler (the `send_email` job).

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use certmill_core::{CertificateId, EmailTemplateId, RecipientId};
use certmill_domain::email_template::DEFAULT_EMAIL_TEMPLATE;
use certmill_queue::{HandlerError, JobEnvelope, JobHandler, JobKind};

use crate::email::{delivery_fields, render_email, EmailError, EmailTransport};
use crate::store::{EntityStore, StoreError};

/// Email dispatch failure. All terminal; the job is never requeued by the
/// pipeline.
#[derive(Debug, thiserror::Error)]
pub enum EmailJobError {
    #[error("unexpected payload for email job")]
    UnexpectedPayload,

    #[error("certificate not found: {0}")]
    CertificateNotFound(CertificateId),

    /// The caller enqueued dispatch before generation completed; there is no
    /// waiting for the file to appear.
    #[error("certificate file not generated yet: {0}")]
    NotGenerated(CertificateId),

    #[error("recipient not found: {0}")]
    RecipientNotFound(RecipientId),

    #[error("email template not found: {0}")]
    TemplateNotFound(EmailTemplateId),

    #[error("default email template not found")]
    DefaultTemplateNotFound,

    #[error(transparent)]
    Transport(#[from] EmailError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct SendEmailHandler {
    store: Arc<dyn EntityStore>,
    transport: Arc<dyn EmailTransport>,
}

impl SendEmailHandler {
    pub fn new(store: Arc<dyn EntityStore>, transport: Arc<dyn EmailTransport>) -> Self {
        Self { store, transport }
    }

    fn process(&self, job: &JobEnvelope) -> Result<(), EmailJobError> {
        let JobKind::SendEmail(payload) = &job.kind else {
            return Err(EmailJobError::UnexpectedPayload);
        };

        let mut certificate = self
            .store
            .certificate(payload.certificate_id)?
            .ok_or(EmailJobError::CertificateNotFound(payload.certificate_id))?;

        if certificate.file_path.is_empty() {
            return Err(EmailJobError::NotGenerated(certificate.id));
        }

        // Re-delivered dispatch for mail that already went out: no-op.
        if certificate.email_sent {
            debug!(certificate_id = %certificate.id, "email already sent; skipping");
            return Ok(());
        }

        let recipient = self
            .store
            .recipient(certificate.recipient_id)?
            .ok_or(EmailJobError::RecipientNotFound(certificate.recipient_id))?;

        let template = match payload.email_template_id {
            Some(id) => self
                .store
                .active_email_template(id)?
                .ok_or(EmailJobError::TemplateNotFound(id))?,
            None => self
                .store
                .active_email_template_by_name(DEFAULT_EMAIL_TEMPLATE)?
                .ok_or(EmailJobError::DefaultTemplateNotFound)?,
        };

        let fields = delivery_fields(&recipient, certificate.id);
        let (subject, html, text) = render_email(&template, &fields);

        self.transport
            .send(&recipient.email, &subject, &html, &text)?;

        certificate.mark_email_sent(Utc::now());
        self.store.update_certificate(&certificate)?;

        Ok(())
    }
}

impl JobHandler for SendEmailHandler {
    fn handle(&self, job: &JobEnvelope) -> Result<(), HandlerError> {
        self.process(job).map_err(|e| HandlerError::new(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use certmill_core::TemplateId;
    use certmill_domain::{Certificate, EmailTemplate, Recipient};
    use certmill_queue::SendEmailJob;

    use super::*;
    use crate::handlers::testing::FakeTransport;
    use crate::store::InMemoryEntityStore;

    struct Fixture {
        store: Arc<InMemoryEntityStore>,
        transport: Arc<FakeTransport>,
        handler: SendEmailHandler,
    }

    fn fixture(transport: FakeTransport) -> Fixture {
        let store = Arc::new(InMemoryEntityStore::new());
        let transport = Arc::new(transport);
        let handler = SendEmailHandler::new(store.clone(), transport.clone());
        Fixture {
            store,
            transport,
            handler,
        }
    }

    fn seed_completed_certificate(store: &InMemoryEntityStore) -> Certificate {
        let recipient = Recipient::new("Asha", "asha@example.org");
        store.insert_recipient(&recipient).unwrap();

        let mut certificate = Certificate::new(TemplateId::new(), recipient.id);
        certificate.mark_completed("events/x/r.pdf");
        store.insert_certificate(&certificate).unwrap();
        certificate
    }

    fn seed_default_template(store: &InMemoryEntityStore) -> EmailTemplate {
        let template = EmailTemplate::new(
            DEFAULT_EMAIL_TEMPLATE,
            "Certificate for {{name}}",
            "<p>{{download_url}}</p>",
        );
        store.insert_email_template(&template).unwrap();
        template
    }

    fn email_job(certificate: &Certificate, template_id: Option<EmailTemplateId>) -> JobEnvelope {
        JobEnvelope::new(
            format!("email-{}", certificate.id),
            JobKind::SendEmail(SendEmailJob {
                certificate_id: certificate.id,
                email_template_id: template_id,
            }),
        )
    }

    #[test]
    fn sends_and_marks_email_sent() {
        let f = fixture(FakeTransport::ok());
        let certificate = seed_completed_certificate(&f.store);
        seed_default_template(&f.store);

        f.handler.handle(&email_job(&certificate, None)).unwrap();

        let sent = f.transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "asha@example.org");
        assert_eq!(sent[0].1, "Certificate for Asha");
        drop(sent);

        let stored = f.store.certificate(certificate.id).unwrap().unwrap();
        assert!(stored.email_sent);
        assert!(stored.email_sent_at.is_some());
    }

    #[test]
    fn ungenerated_certificate_fails_without_side_effects() {
        let f = fixture(FakeTransport::ok());
        seed_default_template(&f.store);

        let recipient = Recipient::new("Asha", "asha@example.org");
        f.store.insert_recipient(&recipient).unwrap();
        let certificate = Certificate::new(TemplateId::new(), recipient.id);
        f.store.insert_certificate(&certificate).unwrap();

        let err = f.handler.handle(&email_job(&certificate, None)).unwrap_err();
        assert!(err.to_string().contains("not generated"));
        assert_eq!(f.transport.sent_count(), 0);

        let stored = f.store.certificate(certificate.id).unwrap().unwrap();
        assert!(!stored.email_sent);
        assert!(stored.email_sent_at.is_none());
    }

    #[test]
    fn missing_named_template_fails() {
        let f = fixture(FakeTransport::ok());
        let certificate = seed_completed_certificate(&f.store);

        let err = f
            .handler
            .handle(&email_job(&certificate, Some(EmailTemplateId::new())))
            .unwrap_err();
        assert!(err.to_string().contains("template not found"));
        assert_eq!(f.transport.sent_count(), 0);
    }

    #[test]
    fn missing_default_template_fails() {
        let f = fixture(FakeTransport::ok());
        let certificate = seed_completed_certificate(&f.store);

        assert!(f.handler.handle(&email_job(&certificate, None)).is_err());
    }

    #[test]
    fn inactive_template_is_invisible() {
        let f = fixture(FakeTransport::ok());
        let certificate = seed_completed_certificate(&f.store);

        let mut template = seed_default_template(&f.store);
        template.is_active = false;
        f.store.insert_email_template(&template).unwrap();

        assert!(f.handler.handle(&email_job(&certificate, None)).is_err());
    }

    #[test]
    fn transport_rejection_leaves_certificate_unsent() {
        let f = fixture(FakeTransport::failing());
        let certificate = seed_completed_certificate(&f.store);
        seed_default_template(&f.store);

        let err = f.handler.handle(&email_job(&certificate, None)).unwrap_err();
        assert!(err.to_string().contains("550"));

        let stored = f.store.certificate(certificate.id).unwrap().unwrap();
        assert!(!stored.email_sent);
    }

    #[test]
    fn redelivery_after_send_is_a_noop() {
        let f = fixture(FakeTransport::ok());
        let certificate = seed_completed_certificate(&f.store);
        seed_default_template(&f.store);

        let job = email_job(&certificate, None);
        f.handler.handle(&job).unwrap();
        f.handler.handle(&job).unwrap();

        assert_eq!(f.transport.sent_count(), 1);
    }
}
