//! Entity persistence: point lookups, simple filters, full-row updates, and
//! the atomic batch counter reports.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryEntityStore;
pub use postgres::PostgresEntityStore;

use certmill_core::{BatchId, CertificateId, EmailTemplateId, RecipientId, TemplateId};
use certmill_domain::{Certificate, CertificateBatch, EmailTemplate, Recipient, Template};

/// Store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("row not found")]
    NotFound,
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Relational store consumed by the pipeline.
///
/// All coordination between workers happens through this store (§ batch
/// counters, certificate status), never through shared in-process state, so
/// implementations must apply `record_batch_success`/`record_batch_failure`
/// as a single atomic read-increment-write on the batch row.
pub trait EntityStore: Send + Sync {
    fn insert_template(&self, template: &Template) -> Result<(), StoreError>;
    /// Lookup without the active filter (used when following a certificate's
    /// template reference).
    fn template(&self, id: TemplateId) -> Result<Option<Template>, StoreError>;
    /// Lookup restricted to active templates (used at submission time).
    fn active_template(&self, id: TemplateId) -> Result<Option<Template>, StoreError>;
    fn list_templates(&self) -> Result<Vec<Template>, StoreError>;

    fn insert_recipient(&self, recipient: &Recipient) -> Result<(), StoreError>;
    fn recipient(&self, id: RecipientId) -> Result<Option<Recipient>, StoreError>;

    fn insert_certificate(&self, certificate: &Certificate) -> Result<(), StoreError>;
    fn certificate(&self, id: CertificateId) -> Result<Option<Certificate>, StoreError>;
    fn update_certificate(&self, certificate: &Certificate) -> Result<(), StoreError>;

    fn insert_batch(&self, batch: &CertificateBatch) -> Result<(), StoreError>;
    fn batch(&self, id: BatchId) -> Result<Option<CertificateBatch>, StoreError>;
    /// Count one successful generation job against the batch. No-op for an
    /// absent or already fully-accounted batch.
    fn record_batch_success(&self, id: BatchId) -> Result<(), StoreError>;
    /// Count one terminally failed generation job against the batch. Same
    /// no-op rule as `record_batch_success`.
    fn record_batch_failure(&self, id: BatchId) -> Result<(), StoreError>;

    fn insert_email_template(&self, template: &EmailTemplate) -> Result<(), StoreError>;
    fn active_email_template(
        &self,
        id: EmailTemplateId,
    ) -> Result<Option<EmailTemplate>, StoreError>;
    fn active_email_template_by_name(
        &self,
        name: &str,
    ) -> Result<Option<EmailTemplate>, StoreError>;
    fn list_email_templates(&self) -> Result<Vec<EmailTemplate>, StoreError>;
}
