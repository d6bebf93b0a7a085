//! Render field resolution: recipient data merged with template
//! configuration, with documented defaults for absent slots.

use std::collections::BTreeMap;

use certmill_domain::{Recipient, TemplateConfig};

/// Field-name → string value mapping handed to the renderer.
pub type RenderFields = BTreeMap<String, String>;

/// HTML template used when the template config names none.
pub const DEFAULT_TEMPLATE_NAME: &str = "certificate.html";

/// Signer title defaults applied when recipient metadata omits them.
pub const DEFAULT_SIGNER1_TITLE: &str = "Event Coordinator";
pub const DEFAULT_SIGNER2_TITLE: &str = "Head Of Department\n(CSE)";
pub const DEFAULT_SIGNER3_TITLE: &str = "Director,\nBhimtal Campus";

/// Merge recipient fields with the template configuration into the flat
/// field set the renderer consumes.
///
/// Signer names/titles come from recipient metadata (titles fall back to the
/// defaults above); image slots come from the template config and are left
/// absent when unconfigured, so the renderer applies its own slot defaults.
pub fn resolve_fields(recipient: &Recipient, config: &TemplateConfig) -> RenderFields {
    let mut fields = RenderFields::new();

    fields.insert("name".into(), recipient.name.clone());
    fields.insert("email".into(), recipient.email.clone());
    fields.insert("course".into(), recipient.course.clone());
    fields.insert("event".into(), recipient.event.clone());
    fields.insert("club".into(), recipient.club.clone());
    fields.insert("date".into(), recipient.date.clone());
    fields.insert("student_id".into(), recipient.student_id.clone());

    fields.insert(
        "signer1_name".into(),
        recipient.metadata_or("signer1_name", "").to_string(),
    );
    fields.insert(
        "signer1_title".into(),
        recipient
            .metadata_or("signer1_title", DEFAULT_SIGNER1_TITLE)
            .to_string(),
    );
    fields.insert(
        "signer2_name".into(),
        recipient.metadata_or("signer2_name", "").to_string(),
    );
    fields.insert(
        "signer2_title".into(),
        recipient
            .metadata_or("signer2_title", DEFAULT_SIGNER2_TITLE)
            .to_string(),
    );
    fields.insert(
        "signer3_name".into(),
        recipient.metadata_or("signer3_name", "").to_string(),
    );
    fields.insert(
        "signer3_title".into(),
        recipient
            .metadata_or("signer3_title", DEFAULT_SIGNER3_TITLE)
            .to_string(),
    );

    let slots = [
        ("side_design", &config.side_design),
        ("org_logo", &config.org_logo),
        ("club_logo", &config.club_logo),
        ("signature1", &config.signature1),
        ("signature2", &config.signature2),
        ("signature3", &config.signature3),
        ("signature4", &config.signature4),
    ];
    for (key, value) in slots {
        if let Some(value) = value {
            fields.insert(key.into(), value.clone());
        }
    }

    fields
}

/// Expand `{{field}}` placeholders against the field map. Placeholders with
/// no matching field are left untouched.
pub fn expand(template: &str, fields: &RenderFields) -> String {
    let mut out = template.to_string();
    for (key, value) in fields {
        out = out.replace(&format!("{{{{{key}}}}}"), value);
    }
    out
}
