#![allow(dead_code)]

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use email_dispatch::{DispatchConfig, MailTransport, OutgoingEmail};
use newsletter_pipeline::{
    ArticleRecord, CompletionRequest, DocumentStore, EnrichedNewsletter, FeedFetcher, LlmAdapter,
    LlmError, PipelineError, Result,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// RSS 2.0 document whose items are 0, 1, 2... days old.
pub fn rss_feed(title: &str, slug: &str, items: usize, now: DateTime<Utc>) -> String {
    let items: String = (0..items)
        .map(|i| {
            let published = (now - Duration::days(i as i64) - Duration::hours(1)).to_rfc2822();
            format!(
                r#"
    <item>
      <title>{title} story {i}</title>
      <link>https://{slug}.example.com/story-{i}</link>
      <pubDate>{published}</pubDate>
      <description>&lt;p&gt;Teaser {i}&lt;/p&gt;</description>
      <content:encoded><![CDATA[<p>Body of {title} story {i}</p><script>track({i})</script>]]></content:encoded>
    </item>"#
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>{title}</title>
    <link>https://{slug}.example.com</link>
    <description>{title} feed</description>
    <language>en</language>{items}
  </channel>
</rss>"#
    )
}

/// Serves canned feed bodies; any URL without one fails like a dead host.
#[derive(Default)]
pub struct StubFetcher {
    bodies: HashMap<String, String>,
    pub calls: AtomicUsize,
}

impl StubFetcher {
    pub fn with_feed(mut self, url: &str, body: String) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }
}

#[async_trait]
impl FeedFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| PipelineError::Parse(format!("connection refused: {}", url)))
    }
}

#[derive(Debug, Clone)]
pub enum StubReply {
    Text(String),
    Fail(u16),
    MissingKey,
}

/// Replays replies in order, repeating the last one once exhausted.
pub struct StubLlm {
    replies: Vec<StubReply>,
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl StubLlm {
    pub fn new(replies: Vec<StubReply>) -> Self {
        Self {
            replies,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(text: impl Into<String>) -> Self {
        Self::new(vec![StubReply::Text(text.into())])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmAdapter for StubLlm {
    fn adapter_name(&self) -> String {
        "stub".to_string()
    }

    async fn complete(&self, request: &CompletionRequest) -> std::result::Result<String, LlmError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let reply = self
            .replies
            .get(call)
            .or_else(|| self.replies.last())
            .cloned()
            .unwrap_or(StubReply::Fail(500));

        match reply {
            StubReply::Text(text) => Ok(text),
            StubReply::Fail(status) => Err(LlmError::Api {
                status,
                message: "stubbed failure".to_string(),
            }),
            StubReply::MissingKey => Err(LlmError::MissingApiKey),
        }
    }
}

#[derive(Default)]
pub struct RecordingStore {
    pub raw: Mutex<Vec<ArticleRecord>>,
    pub newsletters: Mutex<Vec<EnrichedNewsletter>>,
    pub closed: AtomicBool,
    pub fail_writes: bool,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn store_raw_articles(
        &self,
        articles: &[ArticleRecord],
        _fetched_at: DateTime<Utc>,
    ) -> anyhow::Result<usize> {
        if self.fail_writes {
            return Err(anyhow!("store is down"));
        }
        self.raw.lock().unwrap().extend_from_slice(articles);
        Ok(articles.len())
    }

    async fn store_newsletter(
        &self,
        newsletter: &EnrichedNewsletter,
        _generated_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        if self.fail_writes {
            return Err(anyhow!("store is down"));
        }
        self.newsletters.lock().unwrap().push(newsletter.clone());
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    pub reject: bool,
}

#[async_trait]
impl MailTransport for RecordingTransport {
    fn transport_name(&self) -> String {
        "recording".to_string()
    }

    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<String> {
        if self.reject {
            return Err(anyhow!("554 Message rejected"));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(email.clone());
        Ok(format!("stub-message-{}", sent.len()))
    }
}

pub fn dispatch_config() -> DispatchConfig {
    DispatchConfig::new(
        "Tech Weekly Digest",
        "Digest <news@example.com>",
        vec!["reader@example.com".to_string(), "editor@example.com".to_string()],
    )
    .unwrap()
}
