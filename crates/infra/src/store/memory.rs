//! In-memory store for tests and single-process deployments.

use std::collections::HashMap;
use std::sync::RwLock;

use certmill_core::{BatchId, CertificateId, EmailTemplateId, RecipientId, TemplateId};
use certmill_domain::{Certificate, CertificateBatch, EmailTemplate, Recipient, Template};

use super::{EntityStore, StoreError};

/// RwLock-per-aggregate map store. Batch counter reports take the batch map's
/// write lock for the whole read-modify-write, which gives the same
/// atomicity the Postgres implementation gets from a single UPDATE.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    templates: RwLock<HashMap<TemplateId, Template>>,
    recipients: RwLock<HashMap<RecipientId, Recipient>>,
    certificates: RwLock<HashMap<CertificateId, Certificate>>,
    batches: RwLock<HashMap<BatchId, CertificateBatch>>,
    email_templates: RwLock<HashMap<EmailTemplateId, EmailTemplate>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityStore for InMemoryEntityStore {
    fn insert_template(&self, template: &Template) -> Result<(), StoreError> {
        self.templates
            .write()
            .unwrap()
            .insert(template.id, template.clone());
        Ok(())
    }

    fn template(&self, id: TemplateId) -> Result<Option<Template>, StoreError> {
        Ok(self.templates.read().unwrap().get(&id).cloned())
    }

    fn active_template(&self, id: TemplateId) -> Result<Option<Template>, StoreError> {
        Ok(self
            .templates
            .read()
            .unwrap()
            .get(&id)
            .filter(|t| t.is_active)
            .cloned())
    }

    fn list_templates(&self) -> Result<Vec<Template>, StoreError> {
        let mut templates: Vec<_> = self.templates.read().unwrap().values().cloned().collect();
        templates.sort_by_key(|t| t.created_at);
        Ok(templates)
    }

    fn insert_recipient(&self, recipient: &Recipient) -> Result<(), StoreError> {
        self.recipients
            .write()
            .unwrap()
            .insert(recipient.id, recipient.clone());
        Ok(())
    }

    fn recipient(&self, id: RecipientId) -> Result<Option<Recipient>, StoreError> {
        Ok(self.recipients.read().unwrap().get(&id).cloned())
    }

    fn insert_certificate(&self, certificate: &Certificate) -> Result<(), StoreError> {
        self.certificates
            .write()
            .unwrap()
            .insert(certificate.id, certificate.clone());
        Ok(())
    }

    fn certificate(&self, id: CertificateId) -> Result<Option<Certificate>, StoreError> {
        Ok(self.certificates.read().unwrap().get(&id).cloned())
    }

    fn update_certificate(&self, certificate: &Certificate) -> Result<(), StoreError> {
        let mut certificates = self.certificates.write().unwrap();
        if !certificates.contains_key(&certificate.id) {
            return Err(StoreError::NotFound);
        }
        certificates.insert(certificate.id, certificate.clone());
        Ok(())
    }

    fn insert_batch(&self, batch: &CertificateBatch) -> Result<(), StoreError> {
        self.batches.write().unwrap().insert(batch.id, batch.clone());
        Ok(())
    }

    fn batch(&self, id: BatchId) -> Result<Option<CertificateBatch>, StoreError> {
        Ok(self.batches.read().unwrap().get(&id).cloned())
    }

    fn record_batch_success(&self, id: BatchId) -> Result<(), StoreError> {
        let mut batches = self.batches.write().unwrap();
        if let Some(batch) = batches.get_mut(&id) {
            batch.record_success();
        }
        Ok(())
    }

    fn record_batch_failure(&self, id: BatchId) -> Result<(), StoreError> {
        let mut batches = self.batches.write().unwrap();
        if let Some(batch) = batches.get_mut(&id) {
            batch.record_failure();
        }
        Ok(())
    }

    fn insert_email_template(&self, template: &EmailTemplate) -> Result<(), StoreError> {
        self.email_templates
            .write()
            .unwrap()
            .insert(template.id, template.clone());
        Ok(())
    }

    fn active_email_template(
        &self,
        id: EmailTemplateId,
    ) -> Result<Option<EmailTemplate>, StoreError> {
        Ok(self
            .email_templates
            .read()
            .unwrap()
            .get(&id)
            .filter(|t| t.is_active)
            .cloned())
    }

    fn active_email_template_by_name(
        &self,
        name: &str,
    ) -> Result<Option<EmailTemplate>, StoreError> {
        Ok(self
            .email_templates
            .read()
            .unwrap()
            .values()
            .find(|t| t.name == name && t.is_active)
            .cloned())
    }

    fn list_email_templates(&self) -> Result<Vec<EmailTemplate>, StoreError> {
        let mut templates: Vec<_> = self
            .email_templates
            .read()
            .unwrap()
            .values()
            .cloned()
            .collect();
        templates.sort_by_key(|t| t.created_at);
        Ok(templates)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use certmill_domain::{BatchStatus, TemplateConfig};

    use super::*;

    #[test]
    fn active_filter_hides_inactive_templates() {
        let store = InMemoryEntityStore::new();
        let mut template = Template::new("plain", "", TemplateConfig::default());
        template.is_active = false;
        store.insert_template(&template).unwrap();

        assert!(store.template(template.id).unwrap().is_some());
        assert!(store.active_template(template.id).unwrap().is_none());
    }

    #[test]
    fn batch_report_on_absent_batch_is_a_noop() {
        let store = InMemoryEntityStore::new();
        store.record_batch_success(BatchId::new()).unwrap();
        store.record_batch_failure(BatchId::new()).unwrap();
    }

    #[test]
    fn concurrent_reports_never_overcount() {
        let store = Arc::new(InMemoryEntityStore::new());
        let batch = CertificateBatch::new(TemplateId::new(), 8);
        store.insert_batch(&batch).unwrap();

        let mut joins = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            let id = batch.id;
            joins.push(thread::spawn(move || {
                if i % 4 == 0 {
                    store.record_batch_failure(id).unwrap();
                } else {
                    store.record_batch_success(id).unwrap();
                }
            }));
        }
        for join in joins {
            join.join().unwrap();
        }

        let batch = store.batch(batch.id).unwrap().unwrap();
        assert_eq!(batch.processed, 6);
        assert_eq!(batch.failed, 2);
        assert_eq!(batch.status, BatchStatus::Completed);
    }
}
