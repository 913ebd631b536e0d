use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::DispatchConfig;

/// A fully addressed message, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    pub status: DeliveryStatus,
    pub message_id: String,
    pub recipients: Vec<String>,
}

/// An outbound email service. Returns the provider-assigned message id.
#[async_trait]
pub trait MailTransport: Send + Sync {
    fn transport_name(&self) -> String;

    async fn send(&self, email: &OutgoingEmail) -> Result<String>;
}

/// "Tech Weekly Digest - March 03, 2025"
pub fn subject_line(newsletter_name: &str, date: NaiveDate) -> String {
    format!("{} - {}", newsletter_name, date.format("%B %d, %Y"))
}

/// Sends one rendered issue to the whole recipient list in a single call.
pub struct NewsletterDispatcher {
    transport: Arc<dyn MailTransport>,
    config: DispatchConfig,
}

impl NewsletterDispatcher {
    pub fn new(transport: Arc<dyn MailTransport>, config: DispatchConfig) -> Self {
        Self { transport, config }
    }

    pub fn compose(&self, html_body: &str, text_body: &str, date: NaiveDate) -> OutgoingEmail {
        OutgoingEmail {
            from: self.config.source_email.clone(),
            to: self.config.recipients.clone(),
            subject: subject_line(&self.config.newsletter_name, date),
            html_body: html_body.to_string(),
            text_body: text_body.to_string(),
        }
    }

    /// Any failure here is fatal for the run: it is logged and handed back.
    pub async fn dispatch(
        &self,
        html_body: &str,
        text_body: &str,
        date: NaiveDate,
    ) -> Result<DeliveryReceipt> {
        let email = self.compose(html_body, text_body, date);

        match self.transport.send(&email).await {
            Ok(message_id) => {
                info!(
                    transport = %self.transport.transport_name(),
                    recipients = email.to.len(),
                    message_id = %message_id,
                    subject = %email.subject,
                    "Newsletter sent"
                );
                Ok(DeliveryReceipt {
                    status: DeliveryStatus::Success,
                    message_id,
                    recipients: email.to,
                })
            }
            Err(e) => {
                error!("Error sending newsletter via {}: {:#}", self.transport.transport_name(), e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTransport;

    #[async_trait]
    impl MailTransport for EchoTransport {
        fn transport_name(&self) -> String {
            "echo".to_string()
        }

        async fn send(&self, email: &OutgoingEmail) -> Result<String> {
            Ok(format!("echo-{}", email.to.len()))
        }
    }

    fn dispatcher() -> NewsletterDispatcher {
        let config = DispatchConfig::new(
            "Tech Weekly Digest",
            "news@example.com",
            vec!["a@example.com".to_string()],
        )
        .unwrap();
        NewsletterDispatcher::new(Arc::new(EchoTransport), config)
    }

    #[test]
    fn test_compose_and_dispatch() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 21).unwrap();
        let email = dispatcher().compose("<p>Hi</p>", "Hi", date);
        assert_eq!(email.from, "news@example.com");
        assert_eq!(email.subject, "Tech Weekly Digest - November 21, 2025");

        let receipt = tokio_test::block_on(dispatcher().dispatch("<p>Hi</p>", "Hi", date)).unwrap();
        assert_eq!(receipt.message_id, "echo-1");
        assert_eq!(receipt.status, DeliveryStatus::Success);
    }
}
