pub mod rss;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// One configured feed. Fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub url: String,
    pub name: String,
    pub interval: Duration,
}

impl FeedSource {
    pub fn new(url: impl Into<String>, name: impl Into<String>, interval: Duration) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            interval,
        }
    }
}

/// An item as it appears in a feed, before any enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub link: String,
    pub title: String,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to download feed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("feed is not valid RSS: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait FeedReader: Send + Sync {
    /// Returns the feed's entries in feed order.
    async fn entries(&self, source: &FeedSource) -> Result<Vec<FeedEntry>, FeedError>;
}

/// A link is usable only when it has both a scheme and a host.
pub fn is_valid_link(link: &str) -> bool {
    match url::Url::parse(link) {
        Ok(url) => url.host_str().is_some_and(|host| !host.is_empty()),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_validation() {
        assert!(is_valid_link("https://lenta.ru/news/2024/01/01/story/"));
        assert!(is_valid_link("http://ria.ru/20240101/x.html"));
        assert!(!is_valid_link("not-a-url"));
        assert!(!is_valid_link("/relative/path"));
        assert!(!is_valid_link("mailto:editor@example.com"));
        assert!(!is_valid_link(""));
    }
}
