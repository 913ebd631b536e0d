use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::types::{EnrichedArticle, EnrichedNewsletter, Section, SectionKey};

pub const DEFAULT_READ_TIME: u32 = 3;
pub const DEFAULT_ISSUE_NUMBER: u32 = 1;
pub const PLACEHOLDER_URL: &str = "#";

/// An enriched article with every optional field resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderArticle {
    pub title: String,
    pub summary: String,
    pub source_url: String,
    pub source: String,
    pub author: String,
    pub editorial_note: String,
    pub read_time: u32,
    pub tags: Vec<String>,
    pub published_date: String,
}

impl RenderArticle {
    fn from_enriched(article: &EnrichedArticle) -> Self {
        let source_url = if article.link.trim().is_empty() {
            PLACEHOLDER_URL.to_string()
        } else {
            article.link.clone()
        };

        Self {
            title: article.title.clone(),
            summary: article.enhanced_summary.clone(),
            source_url,
            source: article.source.clone(),
            author: article.author.clone(),
            editorial_note: article.editorial_note.clone().unwrap_or_default(),
            read_time: article.read_time.unwrap_or(DEFAULT_READ_TIME),
            tags: article.tags.clone().unwrap_or_default(),
            published_date: article.published_date.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSection {
    pub key: SectionKey,
    pub label: String,
    pub intro: String,
    pub articles: Vec<RenderArticle>,
}

impl RenderSection {
    fn from_enriched(key: SectionKey, section: &Section) -> Self {
        Self {
            key,
            label: key.label().to_string(),
            intro: section.intro.clone(),
            articles: section.articles.iter().map(RenderArticle::from_enriched).collect(),
        }
    }
}

/// The enriched newsletter after the single defaulting pass. Nothing downstream
/// needs to know which fields the model actually sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedNewsletter {
    pub newsletter_intro: String,
    pub newsletter_outro: String,
    pub issue_number: u32,
    pub sections: BTreeMap<SectionKey, RenderSection>,
}

impl NormalizedNewsletter {
    pub fn from_enriched(newsletter: &EnrichedNewsletter) -> Self {
        Self {
            newsletter_intro: newsletter.newsletter_intro.clone(),
            newsletter_outro: newsletter.newsletter_outro.clone(),
            issue_number: newsletter.issue_number.unwrap_or(DEFAULT_ISSUE_NUMBER),
            sections: newsletter
                .sections
                .iter()
                .map(|(key, section)| (*key, RenderSection::from_enriched(*key, section)))
                .collect(),
        }
    }

    fn has_articles(&self, key: SectionKey) -> bool {
        self.sections
            .get(&key)
            .map(|section| !section.articles.is_empty())
            .unwrap_or(false)
    }
}

/// Everything the template needs about the issue itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPayload {
    pub newsletter_intro: String,
    pub newsletter_outro: String,
    pub issue_number: u32,
    pub sections: BTreeMap<SectionKey, RenderSection>,
    /// Sections with at least one article, in render order.
    pub ordered_sections: Vec<RenderSection>,
    pub article_count: usize,
    pub total_read_time: u32,
    pub has_top_stories: bool,
    pub has_deep_dive: bool,
    pub has_quick_hits: bool,
    pub has_tools_resources: bool,
}

impl RenderPayload {
    pub fn has_section(&self, key: SectionKey) -> bool {
        match key {
            SectionKey::TopStories => self.has_top_stories,
            SectionKey::DeepDive => self.has_deep_dive,
            SectionKey::QuickHits => self.has_quick_hits,
            SectionKey::ToolsResources => self.has_tools_resources,
        }
    }
}

/// Pure assembly of the render payload from an enriched newsletter.
pub fn assemble(newsletter: &EnrichedNewsletter) -> RenderPayload {
    let normalized = NormalizedNewsletter::from_enriched(newsletter);

    let article_count = normalized
        .sections
        .values()
        .map(|section| section.articles.len())
        .sum();
    let total_read_time = normalized
        .sections
        .values()
        .flat_map(|section| section.articles.iter())
        .map(|article| article.read_time)
        .sum();

    let ordered_sections = SectionKey::ALL
        .iter()
        .filter(|key| normalized.has_articles(**key))
        .filter_map(|key| normalized.sections.get(key).cloned())
        .collect();

    let payload = RenderPayload {
        has_top_stories: normalized.has_articles(SectionKey::TopStories),
        has_deep_dive: normalized.has_articles(SectionKey::DeepDive),
        has_quick_hits: normalized.has_articles(SectionKey::QuickHits),
        has_tools_resources: normalized.has_articles(SectionKey::ToolsResources),
        article_count,
        total_read_time,
        ordered_sections,
        newsletter_intro: normalized.newsletter_intro,
        newsletter_outro: normalized.newsletter_outro,
        issue_number: normalized.issue_number,
        sections: normalized.sections,
    };

    debug!(
        "Assembled payload: {} articles, {} minutes of reading",
        payload.article_count, payload.total_read_time
    );
    payload
}
