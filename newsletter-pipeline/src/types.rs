use serde::{Deserialize, Serialize};

pub use interfaces::defs::{
    null_as_default, ArticleRecord, EnrichedArticle, EnrichedNewsletter, Section, SectionKey, EXTERNAL_NEWS,
};
pub use interfaces::state::DocumentStore;

use crate::llm_adapter::LlmError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_feed_size_mb: usize,
    pub follow_redirects: bool,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Newsletter-Pipeline/1.0".to_string(),
            timeout_seconds: 30,
            max_feed_size_mb: 10,
            follow_redirects: true,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Feed size exceeds limit: {size_mb}MB")]
    FeedTooLarge { size_mb: usize },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The caller handed the enricher something it must never see (an empty list,
    /// an article without a title or link). Never retried.
    #[error("Invalid enrichment input: {0}")]
    InvalidInput(String),

    /// Every attempt against the text-generation backend failed; carries the last error.
    #[error("Text generation backend failed: {0}")]
    Backend(#[from] LlmError),

    /// The backend answered, but not with a JSON object.
    #[error("Malformed model response: {reason}")]
    MalformedResponse { reason: String },

    /// The response parsed but broke the newsletter contract.
    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    #[error("Template error: {0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("Render error: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("Dispatch failed: {0:#}")]
    Dispatch(anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
