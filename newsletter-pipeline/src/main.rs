use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use email_dispatch::{DispatchConfig, NewsletterDispatcher, SmtpMailTransport};
use newsletter_pipeline::aggregators::rank_by_recency;
use newsletter_pipeline::config::{redact_database_url, AppConfig, Secrets};
use newsletter_pipeline::digest::assemble;
use newsletter_pipeline::{
    DocumentStore, EnrichedNewsletter, FeedAggregator, FeedParser, Fetcher, NewsletterPipeline,
    NewsletterRenderer, OpenAiAdapter, PgDocumentStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};

/// Weekly newsletter pipeline: feeds in, curated email out.
#[derive(Parser)]
#[command(name = "newsletter")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML configuration file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect, enrich, render and send one issue
    Run {
        /// Render but do not send
        #[arg(long)]
        dry_run: bool,

        /// Also write the rendered HTML here
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Collect and rank articles, print them as JSON
    Fetch,

    /// Render a stored enriched newsletter (JSON) to HTML
    Render {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Create the document store tables
    InitDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = AppConfig::load(cli.config.as_deref())?;
    let secrets = Secrets::from_env();

    match cli.command {
        Commands::Run { dry_run, output } => run(config, secrets, dry_run, output.as_deref()).await,
        Commands::Fetch => fetch(config).await,
        Commands::Render { input, output } => render(config, &input, output.as_deref()),
        Commands::InitDb => init_db(secrets).await,
    }
}

async fn run(config: AppConfig, secrets: Secrets, dry_run: bool, output: Option<&Path>) -> Result<()> {
    info!("Starting newsletter run for {}", config.newsletter.name);

    let mut adapter = OpenAiAdapter::new(secrets.openai_api_key.clone(), &config.llm)?;
    if let Some(base_url) = &secrets.openai_base_url {
        adapter = adapter.with_base_url(base_url.clone());
    }

    let mut builder = NewsletterPipeline::builder(config.clone()).llm_adapter(Arc::new(adapter));

    match &secrets.database_url {
        Some(database_url) => match PgDocumentStore::connect(database_url).await {
            Ok(store) => builder = builder.store(Arc::new(store)),
            Err(e) => warn!(
                "Document store at {} unavailable, continuing without persistence: {}",
                redact_database_url(database_url),
                e
            ),
        },
        None => warn!("DATABASE_URL not set, raw articles and newsletter will not be stored"),
    }

    if dry_run {
        info!("Dry run: the newsletter will not be sent");
    } else {
        let transport = SmtpMailTransport::from_env()?;
        let dispatch_config = DispatchConfig::from_env(&config.newsletter.name)?;
        builder = builder.dispatcher(NewsletterDispatcher::new(Arc::new(transport), dispatch_config));
    }

    let pipeline = builder.build()?;
    let html = pipeline.run().await?;

    if let Some(path) = output {
        std::fs::write(path, &html).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote rendered newsletter to {}", path.display());
    }
    Ok(())
}

async fn fetch(config: AppConfig) -> Result<()> {
    let aggregator = FeedAggregator::new(
        Arc::new(Fetcher::new(config.fetch.clone())?),
        FeedParser::new(config.feeds.entries_per_feed),
        config.feeds.urls.clone(),
    );

    let articles = rank_by_recency(aggregator.collect(Utc::now()).await, config.feeds.max_articles);
    println!("{}", serde_json::to_string_pretty(&articles)?);
    Ok(())
}

fn render(config: AppConfig, input: &Path, output: Option<&Path>) -> Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let newsletter: EnrichedNewsletter =
        serde_json::from_str(&raw).context("Input is not an enriched newsletter")?;

    let payload = assemble(&newsletter);
    let html = NewsletterRenderer::new()?.render(&payload, &config.newsletter, Utc::now())?;

    match output {
        Some(path) => {
            std::fs::write(path, &html)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Rendered {} articles to {}", payload.article_count, path.display());
        }
        None => println!("{}", html),
    }
    Ok(())
}

async fn init_db(secrets: Secrets) -> Result<()> {
    let database_url = secrets
        .database_url
        .context("DATABASE_URL environment variable not set")?;

    let store = PgDocumentStore::connect(&database_url).await?;
    store.setup_schema().await?;
    store.close().await;
    Ok(())
}
