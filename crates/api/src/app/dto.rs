//! Request/response DTOs and their mapping to domain types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use certmill_domain::{
    BatchStatus, Certificate, CertificateBatch, CertificateStatus, EmailTemplate, Template,
    TemplateConfig,
};
use certmill_infra::service::RecipientInput;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RecipientData {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub club: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl RecipientData {
    pub fn into_input(self) -> RecipientInput {
        RecipientInput {
            name: self.name,
            email: self.email,
            course: self.course,
            event: self.event,
            club: self.club,
            date: self.date,
            student_id: self.student_id,
            metadata: self.metadata,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateCertificateRequest {
    pub template_id: String,
    pub recipient: RecipientData,
    #[serde(default)]
    pub send_email: bool,
    #[serde(default)]
    pub email_template_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkGenerateRequest {
    pub template_id: String,
    pub recipients: Vec<RecipientData>,
    #[serde(default)]
    pub send_email: bool,
    #[serde(default)]
    pub email_template_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: TemplateConfig,
}

#[derive(Debug, Deserialize)]
pub struct CreateEmailTemplateRequest {
    pub name: String,
    pub subject: String,
    pub body_html: String,
    #[serde(default)]
    pub body_text: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct CertificateResponse {
    pub id: String,
    pub status: CertificateStatus,
    pub file_path: String,
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl CertificateResponse {
    /// Submission-time shape: no download link yet.
    pub fn accepted(certificate: &Certificate) -> Self {
        Self {
            id: certificate.id.to_string(),
            status: certificate.status,
            file_path: certificate.file_path.clone(),
            email_sent: certificate.email_sent,
            download_url: None,
        }
    }

    /// Lookup shape: carries the derived download link.
    pub fn with_download_url(certificate: &Certificate) -> Self {
        Self {
            download_url: Some(download_url(certificate)),
            ..Self::accepted(certificate)
        }
    }
}

pub fn download_url(certificate: &Certificate) -> String {
    format!("/api/v1/certificates/{}/download", certificate.id)
}

#[derive(Debug, Serialize)]
pub struct BatchStatusResponse {
    pub id: String,
    pub total_count: u32,
    pub processed: u32,
    pub failed: u32,
    pub status: BatchStatus,
    /// Percentage of processed jobs; `0` when the batch is empty.
    pub progress: f64,
}

impl BatchStatusResponse {
    pub fn from_batch(batch: &CertificateBatch) -> Self {
        Self {
            id: batch.id.to_string(),
            total_count: batch.total_count,
            processed: batch.processed,
            failed: batch.failed,
            status: batch.status,
            progress: batch.progress(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub config: TemplateConfig,
    pub is_active: bool,
}

impl TemplateResponse {
    pub fn from_template(template: &Template) -> Self {
        Self {
            id: template.id.to_string(),
            name: template.name.clone(),
            description: template.description.clone(),
            config: template.config.clone(),
            is_active: template.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EmailTemplateResponse {
    pub id: String,
    pub name: String,
    pub subject: String,
    pub is_active: bool,
}

impl EmailTemplateResponse {
    pub fn from_template(template: &EmailTemplate) -> Self {
        Self {
            id: template.id.to_string(),
            name: template.name.clone(),
            subject: template.subject.clone(),
            is_active: template.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use certmill_core::TemplateId;

    use super::*;

    #[test]
    fn batch_progress_is_percentage() {
        let mut batch = CertificateBatch::new(TemplateId::new(), 4);
        batch.record_success();
        batch.record_success();
        batch.record_failure();

        let response = BatchStatusResponse::from_batch(&batch);
        assert_eq!(response.progress, 50.0);
        assert_eq!(response.processed, 2);
        assert_eq!(response.failed, 1);
    }

    #[test]
    fn zero_total_batch_reports_zero_progress() {
        let batch = CertificateBatch::new(TemplateId::new(), 0);
        let response = BatchStatusResponse::from_batch(&batch);
        assert_eq!(response.progress, 0.0);
    }

    #[test]
    fn accepted_certificate_omits_download_url() {
        let certificate = Certificate::new(TemplateId::new(), certmill_core::RecipientId::new());
        let value = serde_json::to_value(CertificateResponse::accepted(&certificate)).unwrap();
        assert!(value.get("download_url").is_none());
        assert_eq!(value["status"], "pending");
    }

    #[test]
    fn lookup_certificate_carries_download_url() {
        let mut certificate =
            Certificate::new(TemplateId::new(), certmill_core::RecipientId::new());
        certificate.mark_completed("a/b.pdf");
        let response = CertificateResponse::with_download_url(&certificate);
        assert_eq!(
            response.download_url.unwrap(),
            format!("/api/v1/certificates/{}/download", certificate.id)
        );
    }
}
