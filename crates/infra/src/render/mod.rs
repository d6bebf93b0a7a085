//! Certificate rendering.
//!
//! The pipeline only ever sees the narrow `CertificateRenderer` capability
//! (template name + field map in, bytes out), so tests substitute fakes and
//! the headless-browser machinery stays at the edge behind `PdfEngine`.

pub mod fields;
pub mod html;

#[cfg(feature = "chromium")]
pub mod chromium;

pub use fields::{resolve_fields, RenderFields, DEFAULT_TEMPLATE_NAME};
pub use html::{HtmlRenderer, PassthroughEngine};

#[cfg(feature = "chromium")]
pub use chromium::ChromiumEngine;

/// Rendering error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("pdf capture failed: {0}")]
    Capture(String),
}

/// Converts a named template plus resolved fields into a rendered binary.
pub trait CertificateRenderer: Send + Sync {
    fn render(&self, template_name: &str, fields: &RenderFields) -> Result<Vec<u8>, RenderError>;
}

/// Captures a fully-assembled HTML document as PDF bytes.
pub trait PdfEngine: Send + Sync {
    fn capture(&self, html: &str) -> Result<Vec<u8>, RenderError>;
}
