use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Reads an explicit `null` the same as a missing key.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Provenance tag stamped on every article pulled from a syndication feed.
pub const EXTERNAL_NEWS: &str = "external_news";

/// One syndicated item after normalization.
///
/// `summary` and `full_content` are plain text. `age_days` is the whole-day
/// distance between fetch time and the entry's publish time, or `None` when the
/// feed carried no usable timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub summary: String,
    pub full_content: String,
    pub link: String,
    pub published: String,
    pub source: String,
    pub author: String,
    pub content_type: String,
    pub age_days: Option<u32>,
    pub language: String,
}

/// The four newsletter buckets the enrichment step sorts articles into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    TopStories,
    DeepDive,
    QuickHits,
    ToolsResources,
}

impl SectionKey {
    /// Render order.
    pub const ALL: [SectionKey; 4] = [
        SectionKey::TopStories,
        SectionKey::DeepDive,
        SectionKey::QuickHits,
        SectionKey::ToolsResources,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::TopStories => "top_stories",
            SectionKey::DeepDive => "deep_dive",
            SectionKey::QuickHits => "quick_hits",
            SectionKey::ToolsResources => "tools_resources",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|section| section.as_str() == key)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SectionKey::TopStories => "Top Stories",
            SectionKey::DeepDive => "Deep Dive",
            SectionKey::QuickHits => "Quick Hits",
            SectionKey::ToolsResources => "Tools & Resources",
        }
    }

    /// What belongs in the bucket, phrased for the model.
    pub fn guideline(&self) -> &'static str {
        match self {
            SectionKey::TopStories => {
                "Major news, significant product launches, industry-changing events"
            }
            SectionKey::DeepDive => {
                "Complex topics, detailed analyses, how-to guides that require more attention"
            }
            SectionKey::QuickHits => "Smaller updates, tips, brief news items",
            SectionKey::ToolsResources => {
                "Product reviews, useful tools, resources for professionals"
            }
        }
    }

    /// Soft cap suggested to the model, not enforced on the response.
    pub fn suggested_articles(&self) -> usize {
        match self {
            SectionKey::TopStories => 3,
            SectionKey::DeepDive => 1,
            SectionKey::QuickHits => 4,
            SectionKey::ToolsResources => 2,
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An article as rewritten by the enrichment step.
///
/// `read_time`, `tags` and `published_date` are only present when the model
/// volunteers them; the render step fills defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedArticle {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub enhanced_summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub link: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editorial_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default, deserialize_with = "null_as_default")]
    pub intro: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub articles: Vec<EnrichedArticle>,
}

/// The structured document produced once per run by the enrichment step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedNewsletter {
    #[serde(default, deserialize_with = "null_as_default")]
    pub newsletter_intro: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub newsletter_outro: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sections: BTreeMap<SectionKey, Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_number: Option<u32>,
}

impl EnrichedNewsletter {
    pub fn section(&self, key: SectionKey) -> Option<&Section> {
        self.sections.get(&key)
    }

    pub fn articles(&self) -> impl Iterator<Item = &EnrichedArticle> {
        self.sections.values().flat_map(|section| section.articles.iter())
    }

    pub fn article_count(&self) -> usize {
        self.sections.values().map(|section| section.articles.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_keys_round_trip_through_their_wire_names() {
        for key in SectionKey::ALL {
            assert_eq!(SectionKey::parse(key.as_str()), Some(key));
            let encoded = serde_json::to_string(&key).unwrap();
            assert_eq!(encoded, format!("\"{}\"", key.as_str()));
        }
        assert_eq!(SectionKey::parse("tools_and_resources"), None);
    }

    #[test]
    fn newsletter_tolerates_missing_optional_fields() {
        let newsletter: EnrichedNewsletter = serde_json::from_str(
            r#"{"sections": {"quick_hits": {"articles": [{"title": "A", "link": "https://a"}]}}}"#,
        )
        .unwrap();

        assert_eq!(newsletter.newsletter_intro, "");
        assert_eq!(newsletter.issue_number, None);
        assert_eq!(newsletter.article_count(), 1);
        let article = &newsletter.section(SectionKey::QuickHits).unwrap().articles[0];
        assert_eq!(article.enhanced_summary, "");
        assert!(article.read_time.is_none());
        assert!(newsletter.section(SectionKey::TopStories).is_none());
    }

    #[test]
    fn newsletter_reads_null_fields_as_empty() {
        let newsletter: EnrichedNewsletter = serde_json::from_str(
            r#"{"newsletter_intro": null, "sections": {"deep_dive": {"intro": null, "articles": [
                {"title": "A", "link": null, "author": null, "source": null, "enhanced_summary": null, "tags": null}
            ]}}}"#,
        )
        .unwrap();

        assert_eq!(newsletter.newsletter_intro, "");
        let section = newsletter.section(SectionKey::DeepDive).unwrap();
        assert_eq!(section.intro, "");
        let article = &section.articles[0];
        assert_eq!(article.author, "");
        assert_eq!(article.link, "");
        assert!(article.tags.is_none());
    }
}
