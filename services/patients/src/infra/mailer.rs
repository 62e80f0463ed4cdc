//! SMTP delivery through lettre.

use lettre::message::{Mailbox, Message, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use crate::config::MailConfig;
use crate::domain::repository::MailTransport;
use crate::domain::types::EmailMessage;
use crate::error::MailError;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build the transport. No connection is made until the first send or
    /// [`verify`](Self::verify).
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let from = config
            .from
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("{}: {e}", config.from)))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .credentials(Credentials::new(config.user.clone(), config.pass.clone()))
            .build();
        Ok(Self { transport, from })
    }

    /// Open a connection and check the server accepts it.
    pub async fn verify(&self) -> Result<(), MailError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MailError::Transport(
                "smtp server rejected the connection test".to_owned(),
            )),
            Err(e) => Err(MailError::Transport(e.to_string())),
        }
    }

    fn build_message(&self, message: &EmailMessage) -> Result<Message, MailError> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("{}: {e}", message.to)))?;
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .header(ContentType::TEXT_PLAIN);
        if let Some(subject) = &message.subject {
            builder = builder.subject(subject);
        }
        builder
            .body(message.body.clone())
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

impl MailTransport for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let email = self.build_message(message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }
}
