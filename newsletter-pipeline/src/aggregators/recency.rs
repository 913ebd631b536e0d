use crate::types::ArticleRecord;
use tracing::debug;

/// Freshest first, unknown ages last, at most `limit` articles.
///
/// The sort is stable so equal ages keep their input order.
pub fn rank_by_recency(mut articles: Vec<ArticleRecord>, limit: usize) -> Vec<ArticleRecord> {
    let total = articles.len();
    articles.sort_by_key(|article| article.age_days.unwrap_or(u32::MAX));
    articles.truncate(limit);
    debug!("Ranked {} articles, kept {}", total, articles.len());
    articles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EXTERNAL_NEWS;

    fn aged(title: &str, age_days: Option<u32>) -> ArticleRecord {
        ArticleRecord {
            title: title.to_string(),
            summary: String::new(),
            full_content: "body".to_string(),
            link: format!("https://example.com/{}", title),
            published: String::new(),
            source: "Test".to_string(),
            author: String::new(),
            content_type: EXTERNAL_NEWS.to_string(),
            age_days,
            language: String::new(),
        }
    }

    fn titles(articles: &[ArticleRecord]) -> Vec<&str> {
        articles.iter().map(|a| a.title.as_str()).collect()
    }

    #[test]
    fn test_sorts_ascending_and_stable() {
        let ranked = rank_by_recency(
            vec![
                aged("c", Some(3)),
                aged("a1", Some(0)),
                aged("b", Some(1)),
                aged("a2", Some(0)),
            ],
            10,
        );
        assert_eq!(titles(&ranked), vec!["a1", "a2", "b", "c"]);
    }

    #[test]
    fn test_unknown_age_sorts_last() {
        let ranked = rank_by_recency(
            vec![aged("unknown", None), aged("old", Some(400)), aged("today", Some(0))],
            10,
        );
        assert_eq!(titles(&ranked), vec!["today", "old", "unknown"]);
    }

    #[test]
    fn test_cap_drops_unknown_before_known() {
        let mut articles: Vec<_> = (0..12).map(|i| aged(&format!("u{}", i), None)).collect();
        articles.push(aged("fresh", Some(0)));

        let ranked = rank_by_recency(articles, 10);
        assert_eq!(ranked.len(), 10);
        assert_eq!(ranked[0].title, "fresh");
    }

    #[test]
    fn test_empty_input() {
        assert!(rank_by_recency(Vec::new(), 10).is_empty());
    }
}
