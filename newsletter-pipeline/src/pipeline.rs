use chrono::{DateTime, Local, Utc};
use email_dispatch::{DeliveryReceipt, NewsletterDispatcher};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::aggregator::FeedAggregator;
use crate::aggregators::rank_by_recency;
use crate::config::AppConfig;
use crate::digest::{assemble, RenderPayload};
use crate::enricher::ContentEnricher;
use crate::fetcher::{FeedFetcher, Fetcher};
use crate::llm_adapter::LlmAdapter;
use crate::parser::FeedParser;
use crate::render::{plain_text, NewsletterRenderer};
use crate::types::{ArticleRecord, DocumentStore, EnrichedNewsletter, PipelineError, Result};

/// What one run produced, for callers that want more than the HTML.
#[derive(Debug)]
pub struct RunReport {
    pub html: String,
    pub collected: usize,
    pub ranked: usize,
    pub dropped: Vec<String>,
    pub payload: RenderPayload,
    pub receipt: Option<DeliveryReceipt>,
}

/// The weekly run: collect, rank, enrich, render, dispatch. Stages run one
/// after another and each hands an owned value to the next.
pub struct NewsletterPipeline {
    config: AppConfig,
    aggregator: FeedAggregator,
    enricher: ContentEnricher,
    renderer: NewsletterRenderer,
    store: Option<Arc<dyn DocumentStore>>,
    dispatcher: Option<NewsletterDispatcher>,
}

impl NewsletterPipeline {
    pub fn builder(config: AppConfig) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    /// Runs every stage and returns the rendered HTML.
    pub async fn run(&self) -> Result<String> {
        self.run_report().await.map(|report| report.html)
    }

    /// Like [`run`](Self::run), keeping the intermediate results. The store is
    /// closed whether or not the run succeeds.
    pub async fn run_report(&self) -> Result<RunReport> {
        let result = self.execute().await;
        if let Some(store) = &self.store {
            store.close().await;
        }
        match &result {
            Ok(report) => info!(
                "Newsletter run finished: {} collected, {} ranked, {} published",
                report.collected, report.ranked, report.payload.article_count
            ),
            Err(e) => error!("Newsletter run failed: {}", e),
        }
        result
    }

    async fn execute(&self) -> Result<RunReport> {
        let fetched_at = Utc::now();
        let collected = self.aggregator.collect(fetched_at).await;
        let collected_count = collected.len();
        self.persist_raw(&collected, fetched_at).await;

        let ranked = rank_by_recency(collected, self.config.feeds.max_articles);
        let ranked_count = ranked.len();
        info!("Selected {} of {} articles by recency", ranked_count, collected_count);

        let outcome = self.enricher.enrich(&ranked).await?;
        let generated_at = Utc::now();
        self.persist_newsletter(&outcome.newsletter, generated_at).await;

        let (payload, html) = self.render(&outcome.newsletter, generated_at)?;
        let receipt = self.dispatch(&html).await?;

        Ok(RunReport {
            html,
            collected: collected_count,
            ranked: ranked_count,
            dropped: outcome.dropped,
            payload,
            receipt,
        })
    }

    /// Collection and ranking only, for previews.
    pub async fn collect_ranked(&self) -> Vec<ArticleRecord> {
        let collected = self.aggregator.collect(Utc::now()).await;
        rank_by_recency(collected, self.config.feeds.max_articles)
    }

    pub fn render(
        &self,
        newsletter: &EnrichedNewsletter,
        generated_at: DateTime<Utc>,
    ) -> Result<(RenderPayload, String)> {
        let payload = assemble(newsletter);
        let html = self
            .renderer
            .render(&payload, &self.config.newsletter, generated_at)?;
        info!(
            "Rendered {} articles across {} sections, ~{} min read",
            payload.article_count,
            payload.ordered_sections.len(),
            payload.total_read_time
        );
        Ok((payload, html))
    }

    async fn dispatch(&self, html: &str) -> Result<Option<DeliveryReceipt>> {
        let Some(dispatcher) = &self.dispatcher else {
            info!("No dispatcher configured, skipping send");
            return Ok(None);
        };

        let today = Local::now().date_naive();
        dispatcher
            .dispatch(html, &plain_text(html), today)
            .await
            .map(Some)
            .map_err(PipelineError::Dispatch)
    }

    async fn persist_raw(&self, articles: &[ArticleRecord], fetched_at: DateTime<Utc>) {
        let Some(store) = &self.store else {
            return;
        };
        match store.store_raw_articles(articles, fetched_at).await {
            Ok(count) => info!("Stored {} raw articles", count),
            Err(e) => warn!("Could not store raw articles, continuing: {:#}", e),
        }
    }

    async fn persist_newsletter(&self, newsletter: &EnrichedNewsletter, generated_at: DateTime<Utc>) {
        let Some(store) = &self.store else {
            return;
        };
        match store.store_newsletter(newsletter, generated_at).await {
            Ok(()) => info!("Stored generated newsletter"),
            Err(e) => warn!("Could not store generated newsletter, continuing: {:#}", e),
        }
    }
}

/// Wires the pipeline from explicit parts so tests can swap any of them.
pub struct PipelineBuilder {
    config: AppConfig,
    fetcher: Option<Arc<dyn FeedFetcher>>,
    adapter: Option<Arc<dyn LlmAdapter>>,
    store: Option<Arc<dyn DocumentStore>>,
    dispatcher: Option<NewsletterDispatcher>,
}

impl PipelineBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            fetcher: None,
            adapter: None,
            store: None,
            dispatcher: None,
        }
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn FeedFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn llm_adapter(mut self, adapter: Arc<dyn LlmAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Without a dispatcher the run renders but sends nothing.
    pub fn dispatcher(mut self, dispatcher: NewsletterDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn build(self) -> Result<NewsletterPipeline> {
        self.config.validate()?;

        let adapter = self
            .adapter
            .ok_or_else(|| PipelineError::Config("No LLM adapter configured".to_string()))?;

        let fetcher: Arc<dyn FeedFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(Fetcher::new(self.config.fetch.clone())?),
        };

        let aggregator = FeedAggregator::new(
            fetcher,
            FeedParser::new(self.config.feeds.entries_per_feed),
            self.config.feeds.urls.clone(),
        );
        let enricher = ContentEnricher::new(
            adapter,
            self.config.newsletter.clone(),
            self.config.llm.clone(),
        );

        Ok(NewsletterPipeline {
            aggregator,
            enricher,
            renderer: NewsletterRenderer::new()?,
            store: self.store,
            dispatcher: self.dispatcher,
            config: self.config,
        })
    }
}
