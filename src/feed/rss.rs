use async_trait::async_trait;
use reqwest::Client;

use super::{FeedEntry, FeedError, FeedReader, FeedSource};

pub struct RssFeedReader {
    client: Client,
}

impl RssFeedReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Parses RSS 2.0 with `rss`, and anything else (Atom, RSS 1.0/RDF, JSON Feed)
/// with `feed-rs`. Items without a link cannot be tracked and are dropped.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedEntry>, FeedError> {
    match ::rss::Channel::read_from(bytes) {
        Ok(channel) => Ok(channel_entries(&channel)),
        Err(rss_err) => match feed_rs::parser::parse(bytes) {
            Ok(feed) => Ok(syndication_entries(feed)),
            Err(e) => Err(FeedError::Malformed(format!("{rss_err}; {e}"))),
        },
    }
}

fn channel_entries(channel: &::rss::Channel) -> Vec<FeedEntry> {
    channel
        .items()
        .iter()
        .filter_map(|item| {
            let link = item.link()?.trim();
            Some(FeedEntry {
                link: link.to_string(),
                title: item.title().unwrap_or_default().trim().to_string(),
            })
        })
        .collect()
}

fn syndication_entries(feed: feed_rs::model::Feed) -> Vec<FeedEntry> {
    feed.entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry_link(&entry)?;
            Some(FeedEntry {
                link,
                title: entry
                    .title
                    .map(|t| t.content.trim().to_string())
                    .unwrap_or_default(),
            })
        })
        .collect()
}

/// Prefers the `alternate` link (or one without `rel`), then any link at all.
fn entry_link(entry: &feed_rs::model::Entry) -> Option<String> {
    let usable = |href: &str| !href.trim().is_empty();
    entry
        .links
        .iter()
        .find(|link| {
            usable(&link.href)
                && link
                    .rel
                    .as_deref()
                    .map_or(true, |rel| rel.eq_ignore_ascii_case("alternate"))
        })
        .or_else(|| entry.links.iter().find(|link| usable(&link.href)))
        .map(|link| link.href.trim().to_string())
}

#[async_trait]
impl FeedReader for RssFeedReader {
    async fn entries(&self, source: &FeedSource) -> Result<Vec<FeedEntry>, FeedError> {
        let body = self
            .client
            .get(&source.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let entries = parse_feed(&body[..])?;
        tracing::debug!(source = %source.name, count = entries.len(), "Fetched feed");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example news</title>
    <link>https://news.example</link>
    <description>Latest</description>
    <item>
      <title>First story</title>
      <link>https://news.example/1</link>
    </item>
    <item>
      <title>No link here</title>
    </item>
    <item>
      <link> https://news.example/3 </link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_rss_keeps_feed_order_and_drops_linkless_items() {
        let entries = parse_feed(FEED.as_bytes()).unwrap();
        assert_eq!(
            entries,
            vec![
                FeedEntry {
                    link: "https://news.example/1".to_string(),
                    title: "First story".to_string(),
                },
                FeedEntry {
                    link: "https://news.example/3".to_string(),
                    title: String::new(),
                },
            ]
        );
    }

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example atom</title>
  <id>urn:uuid:60a76c80-d399-11d9-b93c-0003939e0af6</id>
  <updated>2024-01-01T12:00:00Z</updated>
  <entry>
    <title>Atom story</title>
    <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a</id>
    <updated>2024-01-01T12:00:00Z</updated>
    <link rel="edit" href="https://news.example/edit/1"/>
    <link rel="alternate" href="https://news.example/atom/1"/>
  </entry>
  <entry>
    <title>Only an edit link</title>
    <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6b</id>
    <updated>2024-01-01T11:00:00Z</updated>
    <link rel="edit" href="https://news.example/atom/2"/>
  </entry>
  <entry>
    <title>No link</title>
    <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6c</id>
    <updated>2024-01-01T10:00:00Z</updated>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_atom_feed() {
        let entries = parse_feed(ATOM.as_bytes()).unwrap();
        assert_eq!(
            entries,
            vec![
                FeedEntry {
                    link: "https://news.example/atom/1".to_string(),
                    title: "Atom story".to_string(),
                },
                FeedEntry {
                    link: "https://news.example/atom/2".to_string(),
                    title: "Only an edit link".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_feed_rejects_garbage() {
        assert!(matches!(
            parse_feed(b"<html><body>maintenance</body></html>"),
            Err(FeedError::Malformed(_))
        ));
    }
}
