use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{Pool, Postgres};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::redact_database_url;
use crate::types::{ArticleRecord, DocumentStore, EnrichedNewsletter, Result};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS raw_feeds (
        id UUID PRIMARY KEY,
        document JSONB NOT NULL,
        fetched_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS generated_newsletters (
        id UUID PRIMARY KEY,
        document JSONB NOT NULL,
        generated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS raw_feeds_fetched_at_idx ON raw_feeds (fetched_at)",
];

/// Postgres-backed document store: one JSONB document per row.
pub struct PgDocumentStore {
    db: Pool<Postgres>,
}

impl PgDocumentStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url)
            .await?;

        info!("Connected to document store at {}", redact_database_url(database_url));
        Ok(Self { db })
    }

    pub async fn setup_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.db).await?;
        }
        info!("Document store schema is ready");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn store_raw_articles(
        &self,
        articles: &[ArticleRecord],
        fetched_at: DateTime<Utc>,
    ) -> anyhow::Result<usize> {
        let mut tx = self.db.begin().await.context("Failed to open transaction")?;

        for article in articles {
            sqlx::query("INSERT INTO raw_feeds (id, document, fetched_at) VALUES ($1, $2, $3)")
                .bind(Uuid::new_v4())
                .bind(Json(article))
                .bind(fetched_at)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to store raw article {}", article.link))?;
        }

        tx.commit().await.context("Failed to commit raw articles")?;
        debug!("Stored {} raw articles", articles.len());
        Ok(articles.len())
    }

    async fn store_newsletter(
        &self,
        newsletter: &EnrichedNewsletter,
        generated_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO generated_newsletters (id, document, generated_at) VALUES ($1, $2, $3)",
        )
        .bind(id)
        .bind(Json(newsletter))
        .bind(generated_at)
        .execute(&self.db)
        .await
        .context("Failed to store generated newsletter")?;

        debug!("Stored generated newsletter {}", id);
        Ok(())
    }

    async fn close(&self) {
        self.db.close().await;
        debug!("Document store connection closed");
    }
}
