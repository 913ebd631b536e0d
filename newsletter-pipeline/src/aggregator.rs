use crate::fetcher::FeedFetcher;
use crate::parser::FeedParser;
use crate::types::{ArticleRecord, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Collects cleaned articles from every configured feed.
pub struct FeedAggregator {
    fetcher: Arc<dyn FeedFetcher>,
    parser: FeedParser,
    feeds: Vec<String>,
}

impl FeedAggregator {
    pub fn new(fetcher: Arc<dyn FeedFetcher>, parser: FeedParser, feeds: Vec<String>) -> Self {
        Self { fetcher, parser, feeds }
    }

    /// Fetches all feeds concurrently. A source that fails to fetch or parse is
    /// logged and skipped; output keeps feed order, duplicates by link removed.
    pub async fn collect(&self, now: DateTime<Utc>) -> Vec<ArticleRecord> {
        info!("Fetching {} feeds", self.feeds.len());

        let results = join_all(self.feeds.iter().map(|url| self.collect_feed(url, now))).await;

        let mut articles = Vec::new();
        let mut successful_feeds = 0;

        for (url, result) in self.feeds.iter().zip(results) {
            match result {
                Ok(records) => {
                    successful_feeds += 1;
                    articles.extend(records);
                }
                Err(e) => {
                    error!("Failed to process feed {}: {}", url, e);
                }
            }
        }

        let articles = deduplicate(articles);
        info!(
            "Collected {} articles from {}/{} feeds",
            articles.len(),
            successful_feeds,
            self.feeds.len()
        );
        articles
    }

    async fn collect_feed(&self, url: &str, now: DateTime<Utc>) -> Result<Vec<ArticleRecord>> {
        let content = self.fetcher.fetch(url).await?;
        self.parser.normalize(url, &content, now)
    }
}

/// Keeps the first article seen for each link.
pub fn deduplicate(articles: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
    let total = articles.len();
    let mut seen_links = HashSet::new();

    let unique: Vec<ArticleRecord> = articles
        .into_iter()
        .filter(|article| {
            let fresh = seen_links.insert(article.link.clone());
            if !fresh {
                debug!("Removing duplicate entry: {} ({})", article.title, article.link);
            }
            fresh
        })
        .collect();

    let removed_count = total - unique.len();
    if removed_count > 0 {
        info!("Removed {} duplicate entries", removed_count);
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PipelineError, EXTERNAL_NEWS};
    use async_trait::async_trait;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Mirror</title>
    <item>
      <title>Shared story</title>
      <link>https://shared.example.com/story</link>
      <content:encoded>Body</content:encoded>
    </item>
  </channel>
</rss>"#;

    /// Every URL except "down" serves the same one-item feed.
    struct MirrorFetcher;

    #[async_trait]
    impl FeedFetcher for MirrorFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            if url.contains("down") {
                return Err(PipelineError::Parse("timed out".to_string()));
            }
            Ok(FEED.to_string())
        }
    }

    fn record(title: &str, link: &str) -> ArticleRecord {
        ArticleRecord {
            title: title.to_string(),
            summary: String::new(),
            full_content: "body".to_string(),
            link: link.to_string(),
            published: String::new(),
            source: "Test".to_string(),
            author: String::new(),
            content_type: EXTERNAL_NEWS.to_string(),
            age_days: None,
            language: String::new(),
        }
    }

    #[test]
    fn test_deduplicate_keeps_first() {
        let articles = vec![
            record("first", "https://a.example.com/1"),
            record("second", "https://a.example.com/2"),
            record("syndicated copy", "https://a.example.com/1"),
        ];
        let unique = deduplicate(articles);
        let titles: Vec<_> = unique.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second"]);
    }

    #[test]
    fn test_collect_skips_failed_sources_and_duplicates() {
        let aggregator = FeedAggregator::new(
            Arc::new(MirrorFetcher),
            FeedParser::new(5),
            vec![
                "https://one.example.com/rss".to_string(),
                "https://down.example.com/rss".to_string(),
                "https://two.example.com/rss".to_string(),
            ],
        );

        let articles = tokio_test::block_on(aggregator.collect(Utc::now()));

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].source, "Mirror");
        assert_eq!(articles[0].age_days, None);
    }
}
