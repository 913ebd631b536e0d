//! SMTP delivery through lettre. Works against any transactional provider that
//! exposes an SMTP relay (SES, Postmark, SendGrid, Gmail).

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;
use uuid::Uuid;

use crate::config::{SmtpConfig, SmtpSecurity};
use crate::dispatcher::{MailTransport, OutgoingEmail};

pub struct SmtpMailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpMailTransport {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());

        let builder = match config.security {
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                    .context("Failed to create SMTP transport")?
            }
            SmtpSecurity::Wrapper => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .context("Failed to create SMTP transport")?,
            SmtpSecurity::Plain => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            }
        };

        let mailer = builder.port(config.port).credentials(creds).build();

        Ok(Self {
            mailer,
            host: config.host.clone(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(&SmtpConfig::from_env()?)
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    fn transport_name(&self) -> String {
        format!("smtp ({})", self.host)
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<String> {
        let message_id = local_message_id(&email.from);
        let message = build_message(email, &message_id)?;

        let response = self
            .mailer
            .send(message)
            .await
            .context("Failed to send email via SMTP")?;

        let reply = response.first_line().unwrap_or_default();
        debug!("SMTP server replied {:?}: {}", response.code(), reply);

        Ok(message_id_from_reply(reply).unwrap_or(message_id))
    }
}

/// Build a multipart/alternative message addressed to every recipient.
pub fn build_message(email: &OutgoingEmail, message_id: &str) -> Result<Message> {
    let from: Mailbox = email.from.parse().context("Invalid from email address")?;

    let mut builder = Message::builder()
        .from(from)
        .subject(email.subject.clone())
        .message_id(Some(message_id.to_string()));

    for recipient in &email.to {
        let to: Mailbox = recipient
            .parse()
            .with_context(|| format!("Invalid recipient address '{}'", recipient))?;
        builder = builder.to(to);
    }

    builder
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(email.text_body.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(email.html_body.clone()),
                ),
        )
        .context("Failed to build email message")
}

fn local_message_id(from: &str) -> String {
    let domain = from
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim_end_matches('>'))
        .filter(|domain| !domain.is_empty())
        .unwrap_or("localhost");
    format!("<{}@{}>", Uuid::new_v4(), domain)
}

/// Pull the provider's id out of the final SMTP reply line.
///
/// Handles `250 Ok <id>` (SES) and `250 2.0.0 Ok: queued as <id>` (Postfix-style
/// relays). Anything else yields `None`.
pub fn message_id_from_reply(reply: &str) -> Option<String> {
    let reply = reply.trim();

    if let Some((_, rest)) = reply.split_once("queued as ") {
        return rest.split_whitespace().next().map(str::to_string);
    }

    let mut tokens = reply
        .split_whitespace()
        .skip_while(|token| token.chars().all(|c| c.is_ascii_digit() || c == '.'));

    let status = tokens.next()?;
    if !status.trim_end_matches(':').eq_ignore_ascii_case("ok") {
        return None;
    }

    tokens
        .next()
        .map(|id| id.trim_matches(|c| c == '<' || c == '>').to_string())
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            from: "Digest <news@example.com>".to_string(),
            to: vec!["a@example.com".to_string(), "b@example.com".to_string()],
            subject: "Tech Weekly Digest - March 03, 2025".to_string(),
            html_body: "<h1>Hello</h1>".to_string(),
            text_body: "Hello".to_string(),
        }
    }

    #[test]
    fn test_message_id_from_ses_reply() {
        assert_eq!(
            message_id_from_reply("Ok 0100018e2b1c-abc-000000"),
            Some("0100018e2b1c-abc-000000".to_string())
        );
    }

    #[test]
    fn test_message_id_from_queued_reply() {
        assert_eq!(
            message_id_from_reply("2.0.0 Ok: queued as 4F2B81C0A3"),
            Some("4F2B81C0A3".to_string())
        );
    }

    #[test]
    fn test_message_id_missing() {
        assert_eq!(message_id_from_reply("2.0.0 Ok"), None);
        assert_eq!(message_id_from_reply("Accepted"), None);
        assert_eq!(message_id_from_reply(""), None);
    }

    #[test]
    fn test_local_message_id_uses_sender_domain() {
        let id = local_message_id("Digest <news@example.com>");
        assert!(id.starts_with('<'));
        assert!(id.ends_with("@example.com>"));
    }

    #[test]
    fn test_build_message_addresses_every_recipient() {
        let message = build_message(&email(), "<id@example.com>").unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("a@example.com"));
        assert!(raw.contains("b@example.com"));
        assert!(raw.contains("Subject: Tech Weekly Digest - March 03, 2025"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("text/html"));
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let mut bad = email();
        bad.to.push("not an address".to_string());
        assert!(build_message(&bad, "<id@example.com>").is_err());
    }
}
