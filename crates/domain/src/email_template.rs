use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use certmill_core::EmailTemplateId;

/// Name of the email template used when a dispatch job names none.
pub const DEFAULT_EMAIL_TEMPLATE: &str = "default";

/// Subject/body template for certificate delivery mail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: EmailTemplateId,
    /// Unique lookup name; `default` is the designated fallback.
    pub name: String,
    pub subject: String,
    pub body_html: String,
    #[serde(default)]
    pub body_text: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmailTemplate {
    pub fn new(
        name: impl Into<String>,
        subject: impl Into<String>,
        body_html: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: EmailTemplateId::new(),
            name: name.into(),
            subject: subject.into(),
            body_html: body_html.into(),
            body_text: String::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
