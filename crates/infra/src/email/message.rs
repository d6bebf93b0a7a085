//! Delivery message rendering.

use certmill_core::CertificateId;
use certmill_domain::{EmailTemplate, Recipient};

use crate::render::fields::{expand, RenderFields};

/// Fields available to email templates: the recipient's data plus the
/// download link derived from the certificate id.
pub fn delivery_fields(recipient: &Recipient, certificate_id: CertificateId) -> RenderFields {
    let mut fields = RenderFields::new();
    fields.insert("name".into(), recipient.name.clone());
    fields.insert("email".into(), recipient.email.clone());
    fields.insert("course".into(), recipient.course.clone());
    fields.insert("event".into(), recipient.event.clone());
    fields.insert("club".into(), recipient.club.clone());
    fields.insert("date".into(), recipient.date.clone());
    fields.insert(
        "download_url".into(),
        format!("/api/v1/certificates/{certificate_id}/download"),
    );
    fields
}

/// Render subject, HTML body and plain-text body from a template. When the
/// template carries no explicit text body, one is derived from the HTML.
pub fn render_email(template: &EmailTemplate, fields: &RenderFields) -> (String, String, String) {
    let subject = expand(&template.subject, fields);
    let html = expand(&template.body_html, fields);
    let text = if template.body_text.is_empty() {
        html_to_text(&html)
    } else {
        expand(&template.body_text, fields)
    };
    (subject, html, text)
}

/// Crude tag stripping for the text alternative; enough for the simple
/// markup delivery templates use.
fn html_to_text(html: &str) -> String {
    html.replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("<p>", "")
        .replace("</p>", "\n\n")
        .replace("<div>", "")
        .replace("</div>", "\n")
        .replace("<strong>", "")
        .replace("</strong>", "")
        .replace("<em>", "")
        .replace("</em>", "")
}
