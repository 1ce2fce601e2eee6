//! Outreach delivery over an authenticated mail relay
//!
//! [`MailTransport`] is the seam the dispatcher sends through. Delivery failures
//! are reported as [`DeliveryRecord`]s rather than errors so that one bad
//! recipient never aborts a batch.

use crate::config::SmtpConfig;
use crate::error::{Error, Result};
use crate::types::DeliveryRecord;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::time::Duration;

/// Port on which relays expect implicit TLS
pub const IMPLICIT_TLS_PORT: u16 = 465;

/// Timeout for a single relay session
const SESSION_TIMEOUT: Duration = Duration::from_secs(60);

/// A message addressed to one recipient
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
}

/// Capability for delivering one message
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver `message` using the relay described by `config`.
    ///
    /// Never fails; transport and authentication errors come back as a
    /// [`DeliveryRecord`] with status `failed`.
    async fn send(&self, config: &SmtpConfig, message: &OutgoingMessage) -> DeliveryRecord;
}

/// SMTP delivery via lettre, one authenticated session per message
#[derive(Clone, Copy, Debug, Default)]
pub struct SmtpMailTransport;

impl SmtpMailTransport {
    /// Create a new transport
    pub fn new() -> Self {
        Self
    }

    fn relay(config: &SmtpConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let builder = if config.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
        }
        .map_err(|e| Error::Smtp(e.to_string()))?;

        Ok(builder
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.email_address.clone(),
                config.email_password.clone(),
            ))
            .timeout(Some(SESSION_TIMEOUT))
            .build())
    }

    async fn deliver(config: &SmtpConfig, message: &OutgoingMessage) -> Result<()> {
        let email = build_message(&config.email_address, message)?;
        Self::relay(config)?
            .send(email)
            .await
            .map_err(|e| Error::Smtp(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, config: &SmtpConfig, message: &OutgoingMessage) -> DeliveryRecord {
        match Self::deliver(config, message).await {
            Ok(()) => {
                tracing::info!(recipient = %message.to, "Email delivered");
                DeliveryRecord::success(&message.to)
            }
            Err(e) => {
                tracing::warn!(recipient = %message.to, error = %e, "Email delivery failed");
                DeliveryRecord::failure(&message.to, e.to_string())
            }
        }
    }
}

/// Build a plain-text message from `from` to the recipient of `message`
pub fn build_message(from: &str, message: &OutgoingMessage) -> Result<Message> {
    let from: Mailbox = from
        .parse()
        .map_err(|e: lettre::address::AddressError| Error::Smtp(format!("invalid sender: {e}")))?;
    let to: Mailbox = message
        .to
        .parse()
        .map_err(|e: lettre::address::AddressError| Error::Smtp(format!("invalid recipient: {e}")))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())
        .map_err(|e| Error::Smtp(e.to_string()))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeliveryStatus;

    fn outgoing(to: &str) -> OutgoingMessage {
        OutgoingMessage {
            to: to.into(),
            subject: "Hi Acme".into(),
            body: "Dear Acme".into(),
        }
    }

    fn smtp(server: &str, port: u16) -> SmtpConfig {
        SmtpConfig {
            smtp_server: server.into(),
            smtp_port: port,
            email_address: "sender@example.com".into(),
            email_password: "secret".into(),
        }
    }

    #[test]
    fn builds_plain_text_message() {
        let message = build_message("sender@example.com", &outgoing("info@acme.test")).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Hi Acme"));
        assert!(raw.contains("To: info@acme.test"));
        assert!(raw.contains("text/plain"));
    }

    #[test]
    fn invalid_recipient_is_rejected() {
        let err = build_message("sender@example.com", &outgoing("not-an-address")).unwrap_err();
        assert!(err.to_string().contains("invalid recipient"));
    }

    #[test]
    fn relay_builds_for_both_tls_modes() {
        assert!(SmtpMailTransport::relay(&smtp("smtp.example.com", 587)).is_ok());
        assert!(SmtpMailTransport::relay(&smtp("smtp.example.com", IMPLICIT_TLS_PORT)).is_ok());
    }

    #[tokio::test]
    async fn failures_are_reported_as_records() {
        let record = SmtpMailTransport::new()
            .send(&smtp("smtp.example.com", 587), &outgoing("bad address"))
            .await;
        assert_eq!(record.status, DeliveryStatus::Failed);
        assert_eq!(record.email, "bad address");
        assert!(record.error.is_some());
    }
}
