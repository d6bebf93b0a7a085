//! Job envelope and typed payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use certmill_core::{BatchId, CertificateId, EmailTemplateId};

/// Payload of a certificate generation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateCertificateJob {
    pub certificate_id: CertificateId,
    /// Set for bulk submissions; `None` for one-off certificates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<BatchId>,
    #[serde(default)]
    pub send_email: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_template_id: Option<EmailTemplateId>,
}

/// Payload of an email dispatch job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendEmailJob {
    pub certificate_id: CertificateId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_template_id: Option<EmailTemplateId>,
}

/// Discriminated job payload. The wire format keeps the `type`/`data` field
/// pair, so producers in other languages stay compatible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum JobKind {
    GenerateCertificate(GenerateCertificateJob),
    SendEmail(SendEmailJob),
}

impl JobKind {
    pub fn job_type(&self) -> JobType {
        match self {
            JobKind::GenerateCertificate(_) => JobType::GenerateCertificate,
            JobKind::SendEmail(_) => JobType::SendEmail,
        }
    }
}

/// Fieldless discriminant of `JobKind`, used as the dispatch-table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobType {
    GenerateCertificate,
    SendEmail,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::GenerateCertificate => "generate_certificate",
            JobType::SendEmail => "send_email",
        }
    }
}

impl core::fmt::Display for JobType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of queued work.
///
/// `id` is caller-assigned and stable across re-deliveries, so logs from a
/// duplicated job correlate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub id: String,
    #[serde(flatten)]
    pub kind: JobKind,
    pub created_at: DateTime<Utc>,
}

impl JobEnvelope {
    pub fn new(id: impl Into<String>, kind: JobKind) -> Self {
        Self {
            id: id.into(),
            kind,
            created_at: Utc::now(),
        }
    }
}
