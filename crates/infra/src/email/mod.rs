//! Email delivery: message rendering plus the SMTP transport seam.

pub mod message;
pub mod smtp;

pub use message::{delivery_fields, render_email};
pub use smtp::SmtpMailer;

/// Email error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmailError {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Delivers one rendered message to one address.
pub trait EmailTransport: Send + Sync {
    fn send(
        &self,
        to: &str,
        subject: &str,
        body_html: &str,
        body_text: &str,
    ) -> Result<(), EmailError>;
}
