// Re-export commonly used test types and utilities
pub use email_dispatch::{DispatchConfig, MailTransport, NewsletterDispatcher, OutgoingEmail};

use async_trait::async_trait;
use std::sync::Mutex;

/// Test configuration constants
pub const TEST_NEWSLETTER: &str = "Tech Weekly Digest";
pub const TEST_SOURCE_EMAIL: &str = "digest@example.com";

pub fn test_dispatch_config() -> DispatchConfig {
    DispatchConfig::new(
        TEST_NEWSLETTER,
        TEST_SOURCE_EMAIL,
        vec!["reader-one@example.com".to_string(), "reader-two@example.com".to_string()],
    )
    .expect("test recipients are non-empty")
}

/// Transport that keeps every message it is handed.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait]
impl MailTransport for RecordingTransport {
    fn transport_name(&self) -> String {
        "recording".to_string()
    }

    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<String> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(email.clone());
        Ok(format!("recorded-{}", sent.len()))
    }
}

/// Transport whose provider always rejects the message.
pub struct RejectingTransport;

#[async_trait]
impl MailTransport for RejectingTransport {
    fn transport_name(&self) -> String {
        "rejecting".to_string()
    }

    async fn send(&self, _email: &OutgoingEmail) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("554 Message rejected: Email address is not verified"))
    }
}
