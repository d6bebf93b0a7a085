//! SMTP transport backed by lettre.

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::{EmailConfig, SmtpTls};

use super::{EmailError, EmailTransport};

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a mailer from configuration. Fails fast on a bad sender address
    /// or an unresolvable relay.
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let from: Mailbox = if config.from_name.is_empty() {
            config
                .from_email
                .parse()
                .map_err(|e| EmailError::InvalidAddress(format!("{}: {e}", config.from_email)))?
        } else {
            format!("{} <{}>", config.from_name, config.from_email)
                .parse()
                .map_err(|e| EmailError::InvalidAddress(format!("{}: {e}", config.from_email)))?
        };

        let mut builder = match config.tls {
            SmtpTls::Starttls => SmtpTransport::starttls_relay(&config.smtp_host)
                .map_err(|e| EmailError::Transport(e.to_string()))?,
            SmtpTls::Tls => SmtpTransport::relay(&config.smtp_host)
                .map_err(|e| EmailError::Transport(e.to_string()))?,
            SmtpTls::None => SmtpTransport::builder_dangerous(&config.smtp_host),
        }
        .port(config.smtp_port);

        if let (Some(user), Some(password)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

impl EmailTransport for SmtpMailer {
    fn send(
        &self,
        to: &str,
        subject: &str,
        body_html: &str,
        body_text: &str,
    ) -> Result<(), EmailError> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| EmailError::InvalidAddress(format!("{to}: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(
                body_text.to_string(),
                body_html.to_string(),
            ))
            .map_err(|e| EmailError::Build(e.to_string()))?;

        self.transport
            .send(&message)
            .map(|_| ())
            .map_err(|e| EmailError::Transport(e.to_string()))
    }
}
