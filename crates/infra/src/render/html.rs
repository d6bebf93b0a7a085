//! HTML template renderer: loads the named template, expands fields, embeds
//! image slots as data URIs, and hands the document to a `PdfEngine`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::debug;

use super::fields::{expand, RenderFields};
use super::{CertificateRenderer, PdfEngine, RenderError};

/// Image slots and the file each falls back to when the field set carries no
/// value for it. Unresolvable images render as empty attributes rather than
/// failing the certificate.
const IMAGE_SLOTS: &[(&str, &str)] = &[
    ("side_design", "side.svg"),
    ("org_logo", "org-logo.svg"),
    ("club_logo", "club.svg"),
    ("signature1", "signature1.png"),
    ("signature2", "signature2.png"),
    ("signature3", "signature3.png"),
    ("signature4", "signature4.png"),
];

pub struct HtmlRenderer {
    templates_dir: PathBuf,
    engine: Arc<dyn PdfEngine>,
}

impl HtmlRenderer {
    pub fn new(templates_dir: impl Into<PathBuf>, engine: Arc<dyn PdfEngine>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
            engine,
        }
    }

    fn image_data_uri(&self, filename: &str) -> String {
        let candidates = [
            self.templates_dir.join("images").join(filename),
            self.templates_dir.join(filename),
        ];
        for path in &candidates {
            if let Some(uri) = file_to_data_uri(path) {
                return uri;
            }
        }
        String::new()
    }
}

impl CertificateRenderer for HtmlRenderer {
    fn render(&self, template_name: &str, fields: &RenderFields) -> Result<Vec<u8>, RenderError> {
        let template_path = self.templates_dir.join(template_name);
        let template = std::fs::read_to_string(&template_path)
            .map_err(|_| RenderError::TemplateNotFound(template_name.to_string()))?;

        let mut fields = fields.clone();
        for (slot, default) in IMAGE_SLOTS {
            let filename = fields
                .get(*slot)
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| (*default).to_string());
            fields.insert((*slot).to_string(), self.image_data_uri(&filename));
        }

        let html = expand(&template, &fields);
        debug!(template = template_name, bytes = html.len(), "assembled certificate html");

        self.engine.capture(&html)
    }
}

/// Engine that emits the assembled HTML itself instead of printing it.
///
/// Development fallback for builds without the `chromium` feature; artifacts
/// are the HTML documents a real engine would have captured.
pub struct PassthroughEngine;

impl PdfEngine for PassthroughEngine {
    fn capture(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        Ok(html.as_bytes().to_vec())
    }
}

fn file_to_data_uri(path: &Path) -> Option<String> {
    let data = std::fs::read(path).ok()?;

    let mime = match path.extension().and_then(|e| e.to_str()) {
        Some("svg") => "image/svg+xml",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "image/png",
    };

    Some(format!("data:{};base64,{}", mime, BASE64.encode(data)))
}
