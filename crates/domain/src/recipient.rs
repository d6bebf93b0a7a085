use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use certmill_core::RecipientId;

/// The person a certificate is issued to.
///
/// `metadata` carries free-form string fields (signer names/titles and the
/// like) that flow into the rendered field set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: RecipientId,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipient {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RecipientId::new(),
            name: name.into(),
            email: email.into(),
            course: String::new(),
            event: String::new(),
            club: String::new(),
            date: String::new(),
            student_id: String::new(),
            metadata: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Metadata lookup with a fallback for absent keys.
    pub fn metadata_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.metadata.get(key).map(String::as_str).unwrap_or(default)
    }
}
