use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::defs::{ArticleRecord, EnrichedNewsletter};

/// Write-only sink for what a run produced.
///
/// The pipeline never reads back from the store, and a failing write is not
/// allowed to stop a newsletter from going out: callers log the error and move
/// on. `close` releases whatever connection the store holds and must be safe to
/// call after a failed write.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist the normalized article list, each record stamped with `fetched_at`.
    /// Returns how many records were written.
    async fn store_raw_articles(
        &self,
        articles: &[ArticleRecord],
        fetched_at: DateTime<Utc>,
    ) -> Result<usize>;

    /// Persist the enriched newsletter stamped with `generated_at`.
    async fn store_newsletter(
        &self,
        newsletter: &EnrichedNewsletter,
        generated_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn close(&self);
}
