use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("could not assemble message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Outbound mail seam. The catalog only ever hands a finished message over;
/// delivery is somebody else's problem.
pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    from: Mailbox,
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn from_config(config: &Config) -> Result<SmtpMailer, MailError> {
        let transport = match (&config.smtp_username, &config.smtp_password) {
            (Some(username), Some(password)) => SmtpTransport::relay(&config.smtp_host)?
                .credentials(Credentials::new(username.clone(), password.clone()))
                .build(),
            // Local relay without TLS, e.g. a development maildev instance.
            _ => SmtpTransport::builder_dangerous(config.smtp_host.clone())
                .port(config.smtp_port)
                .build(),
        };
        Ok(SmtpMailer {
            from: config.email_from.parse()?,
            transport,
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(subject)
            .body(body.to_owned())?;
        self.transport.send(&message)?;
        Ok(())
    }
}
