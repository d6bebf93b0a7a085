//! `certmill-domain` — issuance entities and their lifecycles.
//!
//! Status transitions live here so every store implementation enforces the
//! same rules. Nothing in this crate touches a queue, a database, or I/O.

pub mod batch;
pub mod certificate;
pub mod email_template;
pub mod recipient;
pub mod template;

pub use batch::{BatchStatus, CertificateBatch};
pub use certificate::{Certificate, CertificateStatus};
pub use email_template::EmailTemplate;
pub use recipient::Recipient;
pub use template::{Template, TemplateConfig};
