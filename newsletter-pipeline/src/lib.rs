pub mod types;
pub mod config;
pub mod rss_utils;
pub mod clean;
pub mod fetcher;
pub mod parser;
pub mod aggregator;
pub mod aggregators;
pub mod llm_adapter;
pub mod enricher;
pub mod digest;
pub mod render;
pub mod state;
pub mod pipeline;

pub use types::*;
pub use config::{AppConfig, NewsletterConfig, Secrets};
pub use fetcher::{FeedFetcher, Fetcher};
pub use parser::FeedParser;
pub use aggregator::FeedAggregator;
pub use llm_adapter::{CompletionRequest, LlmAdapter, LlmError, OpenAiAdapter};
pub use enricher::{ContentEnricher, EnrichmentOutcome};
pub use digest::{assemble, RenderPayload};
pub use render::NewsletterRenderer;
pub use state::PgDocumentStore;
pub use pipeline::{NewsletterPipeline, PipelineBuilder, RunReport};
