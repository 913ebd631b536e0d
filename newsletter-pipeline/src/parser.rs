use crate::clean::clean_text;
use crate::rss_utils::time::age_in_days;
use crate::rss_utils::url::extract_domain;
use crate::types::{ArticleRecord, PipelineError, Result, EXTERNAL_NEWS};
use chrono::{DateTime, Utc};
use feed_rs::parser;
use tracing::{debug, info};

/// Turns a raw feed document into cleaned [`ArticleRecord`]s.
pub struct FeedParser {
    entries_per_feed: usize,
}

impl FeedParser {
    pub fn new(entries_per_feed: usize) -> Self {
        Self { entries_per_feed }
    }

    /// Normalizes the first `entries_per_feed` entries of one feed.
    ///
    /// Entries with no link or no content body are skipped. `now` is the fetch
    /// time used for `age_days`.
    pub fn normalize(&self, feed_url: &str, content: &str, now: DateTime<Utc>) -> Result<Vec<ArticleRecord>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| PipelineError::Parse(format!("Failed to parse feed: {}", e)))?;

        let source = feed
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| extract_domain(feed_url))
            .unwrap_or_else(|| feed_url.to_string());
        let language = feed.language.unwrap_or_default();

        let mut records = Vec::new();
        let mut skipped = 0;

        for entry in feed.entries.into_iter().take(self.entries_per_feed) {
            match Self::normalize_entry(entry, &source, &language, now) {
                Some(record) => records.push(record),
                None => skipped += 1,
            }
        }

        info!(
            "Parsed {} entries from {} ({} skipped without link or body)",
            records.len(),
            source,
            skipped
        );
        Ok(records)
    }

    fn normalize_entry(
        entry: feed_rs::model::Entry,
        source: &str,
        language: &str,
        now: DateTime<Utc>,
    ) -> Option<ArticleRecord> {
        let link = entry.links.first()?.href.trim().to_string();
        if link.is_empty() {
            return None;
        }

        let full_content = clean_text(entry.content.as_ref()?.body.as_deref()?);
        if full_content.is_empty() {
            debug!("Skipping entry with empty body: {}", link);
            return None;
        }

        let title = entry.title.map(|t| clean_text(&t.content)).unwrap_or_default();
        let summary = entry.summary.map(|s| clean_text(&s.content)).unwrap_or_default();
        let author = entry.authors.first().map(|a| a.name.clone()).unwrap_or_default();

        // feed-rs keeps only the parsed timestamp; unparseable date text is dropped.
        let published_at = entry.published.or(entry.updated);
        let published = published_at.map(|dt| dt.to_rfc2822()).unwrap_or_default();
        let age_days = published_at.map(|dt| age_in_days(dt, now));

        Some(ArticleRecord {
            title,
            summary,
            full_content,
            link,
            published,
            source: source.to_string(),
            author,
            content_type: EXTERNAL_NEWS.to_string(),
            age_days,
            language: language.to_string(),
        })
    }
}
