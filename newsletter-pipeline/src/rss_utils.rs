/// Feed-related helpers shared by config validation and the normalizer

/// URL utilities for feeds
pub mod url {
    use url::Url;

    /// Extract domain from URL, without a leading `www.`
    pub fn extract_domain(url_str: &str) -> Option<String> {
        Url::parse(url_str)
            .ok()
            .and_then(|url| url.domain().map(|d| d.trim_start_matches("www.").to_string()))
    }

    /// Validate feed URL format
    pub fn is_valid_rss_url(url_str: &str) -> bool {
        if let Ok(url) = Url::parse(url_str) {
            url.scheme() == "http" || url.scheme() == "https"
        } else {
            false
        }
    }
}

/// Time utilities for entry timestamps
pub mod time {
    use chrono::{DateTime, Utc};

    /// Whole days between `published` and `now`, never negative.
    pub fn age_in_days(published: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
        let days = now.signed_duration_since(published).num_days().max(0);
        u32::try_from(days).unwrap_or(u32::MAX)
    }
}
