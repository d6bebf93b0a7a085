use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use certmill_core::TemplateId;

/// Rendering configuration carried by a certificate template.
///
/// Every field is optional; the renderer and the generation handler supply
/// documented defaults for absent slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Name of the HTML template file to render. Defaults to
    /// `certificate.html`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_design: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub club_logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature4: Option<String>,
}

/// A certificate template: a named HTML layout plus image/signature slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub description: String,
    pub config: TemplateConfig,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    pub fn new(name: impl Into<String>, description: impl Into<String>, config: TemplateConfig) -> Self {
        let now = Utc::now();
        Self {
            id: TemplateId::new(),
            name: name.into(),
            description: description.into(),
            config,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
