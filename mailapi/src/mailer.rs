//! Mail delivery
//!
//! [`Mailer`] is the seam between the RPC service and SMTP, so the service
//! can be exercised without a mail server.

use crate::config::MailConfig;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use mailrpc_core::{Error, Result};

/// A composed HTML message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, mail: Mail) -> Result<()>;
}

/// Delivers over SMTP with implicit TLS and login credentials
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// # Errors
    ///
    /// Returns `Error::Internal` if the relay's TLS parameters cannot be built.
    pub fn new(host: &str, port: u16, username: &str, password: &str) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| Error::Internal(format!("smtp relay {}: {}", host, e)))?
            .port(port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self { transport })
    }

    pub fn from_config(config: &MailConfig) -> Result<Self> {
        Self::new(
            &config.smtp_host,
            config.smtp_port,
            &config.username,
            &config.password,
        )
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[tracing::instrument(skip_all, fields(to = %mail.to))]
    async fn send(&self, mail: Mail) -> Result<()> {
        let message = compose(mail)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| Error::Internal(format!("smtp send: {}", e)))?;

        tracing::info!("mail delivered");
        Ok(())
    }
}

fn compose(mail: Mail) -> Result<Message> {
    Message::builder()
        .from(parse_mailbox("from", &mail.from)?)
        .to(parse_mailbox("to", &mail.to)?)
        .subject(mail.subject)
        .header(ContentType::TEXT_HTML)
        .body(mail.html_body)
        .map_err(|e| Error::Internal(format!("compose mail: {}", e)))
}

fn parse_mailbox(role: &str, address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e| Error::Internal(format!("invalid {} address {:?}: {}", role, address, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail() -> Mail {
        Mail {
            from: "bot@example.com".into(),
            to: "ops@example.com".into(),
            subject: "Contact form".into(),
            html_body: "<b>hi</b>".into(),
        }
    }

    #[test]
    fn test_compose_html_message() {
        let message = compose(mail()).unwrap();
        let text = String::from_utf8(message.formatted()).unwrap();

        assert!(text.contains("From: bot@example.com"));
        assert!(text.contains("To: ops@example.com"));
        assert!(text.contains("Subject: Contact form"));
        assert!(text.contains("Content-Type: text/html; charset=utf-8"));
        assert!(text.contains("<b>hi</b>"));
    }

    #[test]
    fn test_bad_recipient() {
        let mut mail = mail();
        mail.to = "not an address".into();

        match compose(mail) {
            Err(Error::Internal(message)) => assert!(message.starts_with("invalid to address")),
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_missing_sender_rejected() {
        let mut mail = mail();
        mail.from = String::new();
        assert!(compose(mail).is_err());
    }

    #[tokio::test]
    async fn test_smtp_mailer_builds_without_connecting() {
        assert!(SmtpMailer::new("smtp.example.com", 465, "bot", "secret").is_ok());
    }
}
