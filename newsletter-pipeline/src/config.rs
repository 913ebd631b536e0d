//! Static newsletter configuration plus the secrets read from the environment.
//!
//! Everything that is not a credential has a default and can be overridden from
//! a TOML file:
//!
//! ```toml
//! [newsletter]
//! name = "Tech Weekly Digest"
//! brand_color = "#0f766e"
//!
//! [feeds]
//! urls = ["https://techcrunch.com/feed/"]
//!
//! [llm]
//! model = "gpt-4o-mini"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::rss_utils::url::is_valid_rss_url;
use crate::types::{FetchConfig, PipelineError, Result};

pub const DEFAULT_FEEDS: &[&str] = &[
    "https://techcrunch.com/feed/",
    "https://www.theverge.com/rss/index.xml",
    "https://venturebeat.com/feed/",
    "https://www.wired.com/feed/rss",
    "https://www.technologyreview.com/feed/",
    "https://www.deepmind.com/blog/rss.xml",
    "https://www.unite.ai/feed/",
];

/// Identity and branding of the newsletter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsletterConfig {
    pub name: String,
    pub theme: String,
    pub target_audience: String,
    pub brand_color: String,
    pub logo_url: String,
    pub social_links: BTreeMap<String, String>,
    pub unsubscribe_url: String,
    pub preferences_url: String,
    pub forward_url: String,
}

impl Default for NewsletterConfig {
    fn default() -> Self {
        Self {
            name: "Tech Weekly Digest".to_string(),
            theme: "Latest technology news and insights".to_string(),
            target_audience: "Tech professionals and enthusiasts".to_string(),
            brand_color: "#007bff".to_string(),
            logo_url: String::new(),
            social_links: BTreeMap::new(),
            unsubscribe_url: "#".to_string(),
            preferences_url: "#".to_string(),
            forward_url: "#".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    pub urls: Vec<String>,
    /// Entries taken from the top of each feed.
    pub entries_per_feed: usize,
    /// Articles kept after ranking the whole corpus by recency.
    pub max_articles: usize,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            urls: DEFAULT_FEEDS.iter().map(|url| url.to_string()).collect(),
            entries_per_feed: 5,
            max_articles: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_attempts: u32,
    /// Pause between attempts. Zero retries immediately.
    pub retry_delay_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.3,
            max_tokens: 2000,
            max_attempts: 2,
            retry_delay_ms: 0,
            timeout_seconds: 120,
        }
    }
}

/// Everything that can live in the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub newsletter: NewsletterConfig,
    pub feeds: FeedsConfig,
    pub fetch: FetchConfig,
    pub llm: LlmSettings,
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| PipelineError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                let raw = std::fs::read_to_string(path)?;
                Self::from_toml_str(&raw)
            }
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.feeds.urls.is_empty() {
            return Err(PipelineError::Config("No feed URLs configured".to_string()));
        }
        if let Some(bad) = self.feeds.urls.iter().find(|url| !is_valid_rss_url(url)) {
            return Err(PipelineError::Config(format!("Feed URL is not http(s): {}", bad)));
        }
        if self.feeds.entries_per_feed == 0 || self.feeds.max_articles == 0 {
            return Err(PipelineError::Config(
                "entries_per_feed and max_articles must be positive".to_string(),
            ));
        }
        if self.llm.max_attempts == 0 {
            return Err(PipelineError::Config("llm.max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Credentials and endpoints, read once at startup.
#[derive(Clone)]
pub struct Secrets {
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub database_url: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("openai_api_key", &self.openai_api_key.as_deref().map(|_| "<redacted>"))
            .field("openai_base_url", &self.openai_base_url)
            .field("database_url", &self.database_url.as_deref().map(redact_database_url))
            .finish()
    }
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            openai_base_url: non_empty_var("OPENAI_BASE_URL"),
            database_url: non_empty_var("DATABASE_URL"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Hide the password part of a connection string before it reaches a log line.
pub fn redact_database_url(database_url: &str) -> String {
    match url::Url::parse(database_url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        Ok(parsed) => parsed.to_string(),
        Err(_) => "<unparseable database url>".to_string(),
    }
}
