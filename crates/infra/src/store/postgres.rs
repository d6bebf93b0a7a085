//! Postgres-backed entity store.
//!
//! ## Thread safety
//!
//! The sqlx pool is `Send + Sync`; the sync `EntityStore` trait is bridged
//! with a `tokio::runtime::Handle` captured at construction, so worker
//! threads (which have no ambient runtime) can call into it. Async callers
//! must go through `spawn_blocking` — `Handle::block_on` may not run on a
//! runtime thread.
//!
//! ## Batch counters
//!
//! `record_batch_success`/`record_batch_failure` are single conditional
//! UPDATE statements: increment, recompute status, and refuse to count past
//! `total_count`, all inside the row-level atomicity Postgres gives a single
//! statement. Workers in separate processes stay consistent without any
//! shared in-process lock.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use certmill_core::{BatchId, CertificateId, EmailTemplateId, RecipientId, TemplateId};
use certmill_domain::{
    BatchStatus, Certificate, CertificateBatch, CertificateStatus, EmailTemplate, Recipient,
    Template,
};

use super::{EntityStore, StoreError};

pub struct PostgresEntityStore {
    pool: PgPool,
    handle: tokio::runtime::Handle,
}

impl PostgresEntityStore {
    /// Connect, run pending migrations, and capture the current runtime
    /// handle for the sync bridge. Must be called from within a runtime.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self {
            handle: tokio::runtime::Handle::current(),
            pool,
        })
    }

    fn block_on<F>(&self, fut: F) -> F::Output
    where
        F: core::future::Future,
    {
        self.handle.block_on(fut)
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn json_column<T: serde::de::DeserializeOwned>(row: &PgRow, column: &str) -> Result<T, StoreError> {
    let value: serde_json::Value = row.try_get(column).map_err(backend)?;
    serde_json::from_value(value).map_err(|e| StoreError::Backend(e.to_string()))
}

fn certificate_status(s: &str) -> Result<CertificateStatus, StoreError> {
    match s {
        "pending" => Ok(CertificateStatus::Pending),
        "completed" => Ok(CertificateStatus::Completed),
        "failed" => Ok(CertificateStatus::Failed),
        other => Err(StoreError::Backend(format!(
            "unknown certificate status: {other}"
        ))),
    }
}

fn batch_status(s: &str) -> Result<BatchStatus, StoreError> {
    match s {
        "processing" => Ok(BatchStatus::Processing),
        "completed" => Ok(BatchStatus::Completed),
        "failed" => Ok(BatchStatus::Failed),
        other => Err(StoreError::Backend(format!("unknown batch status: {other}"))),
    }
}

fn template_from_row(row: &PgRow) -> Result<Template, StoreError> {
    Ok(Template {
        id: TemplateId::from_uuid(row.try_get("id").map_err(backend)?),
        name: row.try_get("name").map_err(backend)?,
        description: row.try_get("description").map_err(backend)?,
        config: json_column(row, "config")?,
        is_active: row.try_get("is_active").map_err(backend)?,
        created_at: row.try_get("created_at").map_err(backend)?,
        updated_at: row.try_get("updated_at").map_err(backend)?,
    })
}

fn recipient_from_row(row: &PgRow) -> Result<Recipient, StoreError> {
    Ok(Recipient {
        id: RecipientId::from_uuid(row.try_get("id").map_err(backend)?),
        name: row.try_get("name").map_err(backend)?,
        email: row.try_get("email").map_err(backend)?,
        course: row.try_get("course").map_err(backend)?,
        event: row.try_get("event").map_err(backend)?,
        club: row.try_get("club").map_err(backend)?,
        date: row.try_get("date").map_err(backend)?,
        student_id: row.try_get("student_id").map_err(backend)?,
        metadata: json_column(row, "metadata")?,
        created_at: row.try_get("created_at").map_err(backend)?,
        updated_at: row.try_get("updated_at").map_err(backend)?,
    })
}

fn certificate_from_row(row: &PgRow) -> Result<Certificate, StoreError> {
    let status: String = row.try_get("status").map_err(backend)?;
    Ok(Certificate {
        id: CertificateId::from_uuid(row.try_get("id").map_err(backend)?),
        template_id: TemplateId::from_uuid(row.try_get("template_id").map_err(backend)?),
        recipient_id: RecipientId::from_uuid(row.try_get("recipient_id").map_err(backend)?),
        status: certificate_status(&status)?,
        file_path: row.try_get("file_path").map_err(backend)?,
        email_sent: row.try_get("email_sent").map_err(backend)?,
        email_sent_at: row.try_get("email_sent_at").map_err(backend)?,
        created_at: row.try_get("created_at").map_err(backend)?,
        updated_at: row.try_get("updated_at").map_err(backend)?,
    })
}

fn batch_from_row(row: &PgRow) -> Result<CertificateBatch, StoreError> {
    let status: String = row.try_get("status").map_err(backend)?;
    let total: i32 = row.try_get("total_count").map_err(backend)?;
    let processed: i32 = row.try_get("processed").map_err(backend)?;
    let failed: i32 = row.try_get("failed").map_err(backend)?;
    Ok(CertificateBatch {
        id: BatchId::from_uuid(row.try_get("id").map_err(backend)?),
        template_id: TemplateId::from_uuid(row.try_get("template_id").map_err(backend)?),
        total_count: total.max(0) as u32,
        processed: processed.max(0) as u32,
        failed: failed.max(0) as u32,
        status: batch_status(&status)?,
        created_at: row.try_get("created_at").map_err(backend)?,
        updated_at: row.try_get("updated_at").map_err(backend)?,
    })
}

fn email_template_from_row(row: &PgRow) -> Result<EmailTemplate, StoreError> {
    Ok(EmailTemplate {
        id: EmailTemplateId::from_uuid(row.try_get("id").map_err(backend)?),
        name: row.try_get("name").map_err(backend)?,
        subject: row.try_get("subject").map_err(backend)?,
        body_html: row.try_get("body_html").map_err(backend)?,
        body_text: row.try_get("body_text").map_err(backend)?,
        is_active: row.try_get("is_active").map_err(backend)?,
        created_at: row.try_get("created_at").map_err(backend)?,
        updated_at: row.try_get("updated_at").map_err(backend)?,
    })
}

impl EntityStore for PostgresEntityStore {
    fn insert_template(&self, template: &Template) -> Result<(), StoreError> {
        let config = serde_json::to_value(&template.config)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.block_on(async {
            sqlx::query(
                r#"
                INSERT INTO templates (id, name, description, config, is_active, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(template.id.as_uuid())
            .bind(&template.name)
            .bind(&template.description)
            .bind(&config)
            .bind(template.is_active)
            .bind(template.created_at)
            .bind(template.updated_at)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
            Ok(())
        })
    }

    fn template(&self, id: TemplateId) -> Result<Option<Template>, StoreError> {
        self.block_on(async {
            let row = sqlx::query("SELECT * FROM templates WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
            row.as_ref().map(template_from_row).transpose()
        })
    }

    fn active_template(&self, id: TemplateId) -> Result<Option<Template>, StoreError> {
        self.block_on(async {
            let row = sqlx::query("SELECT * FROM templates WHERE id = $1 AND is_active = TRUE")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
            row.as_ref().map(template_from_row).transpose()
        })
    }

    fn list_templates(&self) -> Result<Vec<Template>, StoreError> {
        self.block_on(async {
            let rows = sqlx::query("SELECT * FROM templates ORDER BY created_at")
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?;
            rows.iter().map(template_from_row).collect()
        })
    }

    fn insert_recipient(&self, recipient: &Recipient) -> Result<(), StoreError> {
        let metadata = serde_json::to_value(&recipient.metadata)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.block_on(async {
            sqlx::query(
                r#"
                INSERT INTO recipients
                    (id, name, email, course, event, club, date, student_id, metadata, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(recipient.id.as_uuid())
            .bind(&recipient.name)
            .bind(&recipient.email)
            .bind(&recipient.course)
            .bind(&recipient.event)
            .bind(&recipient.club)
            .bind(&recipient.date)
            .bind(&recipient.student_id)
            .bind(&metadata)
            .bind(recipient.created_at)
            .bind(recipient.updated_at)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
            Ok(())
        })
    }

    fn recipient(&self, id: RecipientId) -> Result<Option<Recipient>, StoreError> {
        self.block_on(async {
            let row = sqlx::query("SELECT * FROM recipients WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
            row.as_ref().map(recipient_from_row).transpose()
        })
    }

    fn insert_certificate(&self, certificate: &Certificate) -> Result<(), StoreError> {
        self.block_on(async {
            sqlx::query(
                r#"
                INSERT INTO certificates
                    (id, template_id, recipient_id, status, file_path, email_sent, email_sent_at, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(certificate.id.as_uuid())
            .bind(certificate.template_id.as_uuid())
            .bind(certificate.recipient_id.as_uuid())
            .bind(certificate.status.as_str())
            .bind(&certificate.file_path)
            .bind(certificate.email_sent)
            .bind(certificate.email_sent_at)
            .bind(certificate.created_at)
            .bind(certificate.updated_at)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
            Ok(())
        })
    }

    fn certificate(&self, id: CertificateId) -> Result<Option<Certificate>, StoreError> {
        self.block_on(async {
            let row = sqlx::query("SELECT * FROM certificates WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
            row.as_ref().map(certificate_from_row).transpose()
        })
    }

    fn update_certificate(&self, certificate: &Certificate) -> Result<(), StoreError> {
        self.block_on(async {
            let result = sqlx::query(
                r#"
                UPDATE certificates
                SET status = $2, file_path = $3, email_sent = $4, email_sent_at = $5, updated_at = $6
                WHERE id = $1
                "#,
            )
            .bind(certificate.id.as_uuid())
            .bind(certificate.status.as_str())
            .bind(&certificate.file_path)
            .bind(certificate.email_sent)
            .bind(certificate.email_sent_at)
            .bind(certificate.updated_at)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }

    fn insert_batch(&self, batch: &CertificateBatch) -> Result<(), StoreError> {
        self.block_on(async {
            sqlx::query(
                r#"
                INSERT INTO certificate_batches
                    (id, template_id, total_count, processed, failed, status, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(batch.id.as_uuid())
            .bind(batch.template_id.as_uuid())
            .bind(batch.total_count as i32)
            .bind(batch.processed as i32)
            .bind(batch.failed as i32)
            .bind(batch.status.as_str())
            .bind(batch.created_at)
            .bind(batch.updated_at)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
            Ok(())
        })
    }

    fn batch(&self, id: BatchId) -> Result<Option<CertificateBatch>, StoreError> {
        self.block_on(async {
            let row = sqlx::query("SELECT * FROM certificate_batches WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
            row.as_ref().map(batch_from_row).transpose()
        })
    }

    fn record_batch_success(&self, id: BatchId) -> Result<(), StoreError> {
        // One statement: increment, derive status, refuse to overcount. A
        // success can never be the report that makes failed == total_count.
        self.block_on(async {
            sqlx::query(
                r#"
                UPDATE certificate_batches
                SET processed = processed + 1,
                    status = CASE
                        WHEN processed + failed + 1 >= total_count THEN 'completed'
                        ELSE status
                    END,
                    updated_at = NOW()
                WHERE id = $1 AND processed + failed < total_count
                "#,
            )
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
            Ok(())
        })
    }

    fn record_batch_failure(&self, id: BatchId) -> Result<(), StoreError> {
        self.block_on(async {
            sqlx::query(
                r#"
                UPDATE certificate_batches
                SET failed = failed + 1,
                    status = CASE
                        WHEN processed + failed + 1 >= total_count THEN
                            CASE WHEN failed + 1 >= total_count THEN 'failed' ELSE 'completed' END
                        ELSE status
                    END,
                    updated_at = NOW()
                WHERE id = $1 AND processed + failed < total_count
                "#,
            )
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
            Ok(())
        })
    }

    fn insert_email_template(&self, template: &EmailTemplate) -> Result<(), StoreError> {
        self.block_on(async {
            sqlx::query(
                r#"
                INSERT INTO email_templates
                    (id, name, subject, body_html, body_text, is_active, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(template.id.as_uuid())
            .bind(&template.name)
            .bind(&template.subject)
            .bind(&template.body_html)
            .bind(&template.body_text)
            .bind(template.is_active)
            .bind(template.created_at)
            .bind(template.updated_at)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
            Ok(())
        })
    }

    fn active_email_template(
        &self,
        id: EmailTemplateId,
    ) -> Result<Option<EmailTemplate>, StoreError> {
        self.block_on(async {
            let row = sqlx::query("SELECT * FROM email_templates WHERE id = $1 AND is_active = TRUE")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
            row.as_ref().map(email_template_from_row).transpose()
        })
    }

    fn active_email_template_by_name(
        &self,
        name: &str,
    ) -> Result<Option<EmailTemplate>, StoreError> {
        self.block_on(async {
            let row =
                sqlx::query("SELECT * FROM email_templates WHERE name = $1 AND is_active = TRUE")
                    .bind(name)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(backend)?;
            row.as_ref().map(email_template_from_row).transpose()
        })
    }

    fn list_email_templates(&self) -> Result<Vec<EmailTemplate>, StoreError> {
        self.block_on(async {
            let rows = sqlx::query("SELECT * FROM email_templates ORDER BY created_at")
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?;
            rows.iter().map(email_template_from_row).collect()
        })
    }
}
