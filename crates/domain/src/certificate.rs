use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use certmill_core::{CertificateId, RecipientId, TemplateId};

/// Certificate lifecycle status.
///
/// A certificate is created `Pending` and leaves that state exactly once:
/// generation moves it to `Completed` (with a file path) or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    Pending,
    Completed,
    Failed,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Pending => "pending",
            CertificateStatus::Completed => "completed",
            CertificateStatus::Failed => "failed",
        }
    }
}

impl core::fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single issued (or to-be-issued) certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: CertificateId,
    pub template_id: TemplateId,
    pub recipient_id: RecipientId,
    pub status: CertificateStatus,
    /// Empty until the certificate reaches `Completed`.
    pub file_path: String,
    pub email_sent: bool,
    pub email_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Certificate {
    /// Create a new pending certificate for a recipient.
    pub fn new(template_id: TemplateId, recipient_id: RecipientId) -> Self {
        let now = Utc::now();
        Self {
            id: CertificateId::new(),
            template_id,
            recipient_id,
            status: CertificateStatus::Pending,
            file_path: String::new(),
            email_sent: false,
            email_sent_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A terminal certificate is never regenerated; duplicate generation jobs
    /// must treat it as a no-op.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            CertificateStatus::Completed | CertificateStatus::Failed
        )
    }

    /// Record successful generation. `file_path` must be the stored artifact
    /// location; it is the only way the path becomes non-empty.
    pub fn mark_completed(&mut self, file_path: impl Into<String>) {
        self.status = CertificateStatus::Completed;
        self.file_path = file_path.into();
        self.updated_at = Utc::now();
    }

    /// Record a terminal generation failure.
    pub fn mark_failed(&mut self) {
        self.status = CertificateStatus::Failed;
        self.updated_at = Utc::now();
    }

    /// Record a successful email dispatch for this certificate.
    pub fn mark_email_sent(&mut self, at: DateTime<Utc>) {
        self.email_sent = true;
        self.email_sent_at = Some(at);
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_pending_with_empty_path() {
        let cert = Certificate::new(TemplateId::new(), RecipientId::new());
        assert_eq!(cert.status, CertificateStatus::Pending);
        assert!(cert.file_path.is_empty());
        assert!(!cert.is_terminal());
        assert!(!cert.email_sent);
    }

    #[test]
    fn completion_sets_path_and_terminal() {
        let mut cert = Certificate::new(TemplateId::new(), RecipientId::new());
        cert.mark_completed("events/x/r.pdf");
        assert_eq!(cert.status, CertificateStatus::Completed);
        assert_eq!(cert.file_path, "events/x/r.pdf");
        assert!(cert.is_terminal());
    }

    #[test]
    fn failure_keeps_path_empty() {
        let mut cert = Certificate::new(TemplateId::new(), RecipientId::new());
        cert.mark_failed();
        assert_eq!(cert.status, CertificateStatus::Failed);
        assert!(cert.file_path.is_empty());
        assert!(cert.is_terminal());
    }

    #[test]
    fn email_sent_carries_timestamp() {
        let mut cert = Certificate::new(TemplateId::new(), RecipientId::new());
        cert.mark_completed("a/b.pdf");
        let at = Utc::now();
        cert.mark_email_sent(at);
        assert!(cert.email_sent);
        assert_eq!(cert.email_sent_at, Some(at));
    }

    #[test]
    fn status_serializes_lowercase() {
        let s = serde_json::to_string(&CertificateStatus::Completed).unwrap();
        assert_eq!(s, "\"completed\"");
    }
}
