//! AI-assisted enrichment: one completion request turns the ranked articles
//! into a sectioned newsletter.
//!
//! Transport failures are retried; a response that arrives but does not parse,
//! or that references articles nobody asked about, fails the run immediately.

use backoff::backoff::{Backoff, Constant};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{LlmSettings, NewsletterConfig};
use crate::llm_adapter::{CompletionRequest, LlmAdapter};
use crate::types::{
    null_as_default, ArticleRecord, EnrichedArticle, EnrichedNewsletter, PipelineError, Result,
    Section, SectionKey,
};

/// The newsletter plus the input articles the model chose to leave out.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentOutcome {
    pub newsletter: EnrichedNewsletter,
    pub dropped: Vec<String>,
}

pub struct ContentEnricher {
    adapter: Arc<dyn LlmAdapter>,
    newsletter: NewsletterConfig,
    settings: LlmSettings,
}

impl ContentEnricher {
    pub fn new(adapter: Arc<dyn LlmAdapter>, newsletter: NewsletterConfig, settings: LlmSettings) -> Self {
        Self {
            adapter,
            newsletter,
            settings,
        }
    }

    pub async fn enrich(&self, articles: &[ArticleRecord]) -> Result<EnrichmentOutcome> {
        check_input(articles)?;

        let request = self.build_request(articles)?;
        let raw = self.complete_with_retry(&request).await?;

        let newsletter = parse_response(&raw)?;
        let outcome = validate_response(newsletter, articles)?;

        if outcome.newsletter.article_count() == 0 {
            warn!("Model returned a newsletter with no articles");
        }
        if !outcome.dropped.is_empty() {
            info!(
                "Model left out {} of {} articles: {:?}",
                outcome.dropped.len(),
                articles.len(),
                outcome.dropped
            );
        }
        info!(
            "Enriched newsletter has {} articles across {} sections",
            outcome.newsletter.article_count(),
            outcome.newsletter.sections.len()
        );

        Ok(outcome)
    }

    pub fn build_request(&self, articles: &[ArticleRecord]) -> Result<CompletionRequest> {
        Ok(CompletionRequest {
            model: self.settings.model.clone(),
            system_prompt: system_prompt(&self.newsletter),
            user_prompt: user_prompt(articles)?,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        })
    }

    async fn complete_with_retry(&self, request: &CompletionRequest) -> Result<String> {
        let mut backoff = Constant::new(Duration::from_millis(self.settings.retry_delay_ms));
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.adapter.complete(request).await {
                Ok(raw) => {
                    debug!("Completion received on attempt {} ({} bytes)", attempt, raw.len());
                    return Ok(raw);
                }
                Err(e) if attempt < max_attempts && e.is_transient() => {
                    warn!(
                        "Attempt {}/{} against {} failed: {}",
                        attempt,
                        max_attempts,
                        self.adapter.adapter_name(),
                        e
                    );
                    if let Some(delay) = backoff.next_backoff() {
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                    attempt += 1;
                }
                Err(e) => {
                    warn!(
                        "Attempt {}/{} against {} failed, giving up: {}",
                        attempt,
                        max_attempts,
                        self.adapter.adapter_name(),
                        e
                    );
                    return Err(PipelineError::Backend(e));
                }
            }
        }
    }
}

fn check_input(articles: &[ArticleRecord]) -> Result<()> {
    if articles.is_empty() {
        return Err(PipelineError::InvalidInput("no articles to enrich".to_string()));
    }
    if let Some(position) = articles
        .iter()
        .position(|a| a.title.trim().is_empty() || a.link.trim().is_empty())
    {
        return Err(PipelineError::InvalidInput(format!(
            "article {} has no title or link",
            position
        )));
    }
    Ok(())
}

pub fn system_prompt(newsletter: &NewsletterConfig) -> String {
    let guidelines = SectionKey::ALL
        .iter()
        .map(|key| {
            format!(
                "- {} (\"{}\", up to {} articles): {}",
                key.label(),
                key.as_str(),
                key.suggested_articles(),
                key.guideline()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are the editor of \"{name}\", a weekly newsletter about {theme}.\n\
         Your readers are {audience}.\n\n\
         Sort the articles you are given into these sections:\n{guidelines}\n\n\
         Rewrite each chosen article's summary in an engaging, accurate voice. Never add facts \
         that are not in the article. Skip articles that are not worth the reader's time. \
         Keep every article's title and link exactly as given. Leave out a section entirely \
         when no article fits it. Answer with a single JSON object and nothing else.",
        name = newsletter.name,
        theme = newsletter.theme,
        audience = newsletter.target_audience,
        guidelines = guidelines,
    )
}

const RESPONSE_SHAPE: &str = r#"{
  "newsletter_intro": "2-3 sentences welcoming readers to this issue",
  "sections": {
    "top_stories": {
      "intro": "one sentence introducing the section",
      "articles": [
        {
          "title": "exact title from the input",
          "enhanced_summary": "2-4 sentence rewrite",
          "link": "exact link from the input",
          "source": "source name",
          "author": "author if known",
          "editorial_note": "optional one-line take"
        }
      ]
    },
    "deep_dive": { "intro": "...", "articles": [] },
    "quick_hits": { "intro": "...", "articles": [] },
    "tools_resources": { "intro": "...", "articles": [] }
  },
  "newsletter_outro": "1-2 sentences signing off"
}"#;

pub fn user_prompt(articles: &[ArticleRecord]) -> Result<String> {
    let serialized = serde_json::to_string_pretty(articles)?;
    Ok(format!(
        "Here are this week's {count} articles as JSON:\n\n{serialized}\n\n\
         Respond with JSON in exactly this shape:\n{shape}",
        count = articles.len(),
        serialized = serialized,
        shape = RESPONSE_SHAPE,
    ))
}

/// Newsletter as the model sent it, section keys not yet checked.
#[derive(Debug, Deserialize)]
struct RawNewsletter {
    #[serde(default, deserialize_with = "null_as_default")]
    newsletter_intro: String,
    #[serde(default, deserialize_with = "null_as_default")]
    newsletter_outro: String,
    #[serde(default, deserialize_with = "null_as_default")]
    sections: BTreeMap<String, Section>,
    #[serde(default)]
    issue_number: Option<u32>,
}

/// Strip an optional markdown code fence around the JSON body.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn parse_response(raw: &str) -> Result<RawNewsletter> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(raw)).map_err(|e| {
        PipelineError::MalformedResponse {
            reason: e.to_string(),
        }
    })?;

    if !value.is_object() {
        return Err(PipelineError::MalformedResponse {
            reason: "expected a JSON object".to_string(),
        });
    }

    serde_json::from_value(value)
        .map_err(|e| PipelineError::InvalidResponse(format!("unexpected newsletter shape: {}", e)))
}

/// Check section keys and trace every article back to an input record.
///
/// A match is by link, falling back to exact title. Empty `link`, `source` and
/// `author` fields are filled from the matched record.
fn validate_response(raw: RawNewsletter, articles: &[ArticleRecord]) -> Result<EnrichmentOutcome> {
    let mut sections = BTreeMap::new();
    let mut referenced = HashSet::new();

    for (key, section) in raw.sections {
        let section_key = SectionKey::parse(&key)
            .ok_or_else(|| PipelineError::InvalidResponse(format!("unknown section '{}'", key)))?;

        let mut traced = Vec::with_capacity(section.articles.len());
        for article in section.articles {
            let (index, record) = find_record(&article, articles).ok_or_else(|| {
                PipelineError::InvalidResponse(format!(
                    "article '{}' ({}) in {} does not match any input article",
                    article.title, article.link, section_key
                ))
            })?;
            referenced.insert(index);
            traced.push(backfill(article, record));
        }

        sections.insert(
            section_key,
            Section {
                intro: section.intro,
                articles: traced,
            },
        );
    }

    let dropped = articles
        .iter()
        .enumerate()
        .filter(|(index, _)| !referenced.contains(index))
        .map(|(_, record)| record.title.clone())
        .collect();

    Ok(EnrichmentOutcome {
        newsletter: EnrichedNewsletter {
            newsletter_intro: raw.newsletter_intro,
            newsletter_outro: raw.newsletter_outro,
            sections,
            issue_number: raw.issue_number,
        },
        dropped,
    })
}

fn find_record<'a>(
    article: &EnrichedArticle,
    articles: &'a [ArticleRecord],
) -> Option<(usize, &'a ArticleRecord)> {
    let link = article.link.trim();
    let title = article.title.trim();

    articles
        .iter()
        .enumerate()
        .find(|(_, record)| !link.is_empty() && record.link == link)
        .or_else(|| {
            articles
                .iter()
                .enumerate()
                .find(|(_, record)| !title.is_empty() && record.title == title)
        })
}

fn backfill(mut article: EnrichedArticle, record: &ArticleRecord) -> EnrichedArticle {
    if article.title.trim().is_empty() {
        article.title = record.title.clone();
    }
    if article.link.trim().is_empty() {
        article.link = record.link.clone();
    }
    if article.source.trim().is_empty() {
        article.source = record.source.clone();
    }
    if article.author.trim().is_empty() {
        article.author = record.author.clone();
    }
    if article.published_date.is_none() && !record.published.is_empty() {
        article.published_date = Some(record.published.clone());
    }
    article
}
