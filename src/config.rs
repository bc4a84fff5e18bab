use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::constant::*;
use crate::feed::FeedSource;

#[derive(Debug, Clone)]
pub struct Config {
    // Telegram configuration
    pub telegram_api_token: String,
    pub telegram_channel_id: String,
    pub telegram_dry_run: bool,

    // Feeds
    pub feed_sources: Vec<FeedSource>,

    // Store
    pub store_path: String,
    pub retention_days: i64,
    pub retention_sweep_interval: Option<Duration>,

    // Rendering engine; plain HTTP when unset
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,

    // Delivery
    pub max_delivery_attempts: u32,
    pub announce_interval: Duration,
    pub announce_message: String,
    pub source_label: String,
    pub read_more_label: String,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{name} must be a valid {}: {e}", std::any::type_name::<T>())),
        None => Ok(default),
    }
}

fn parse_flag(name: &str) -> bool {
    var(name).is_some_and(|v| matches!(v.trim(), "1" | "true" | "True" | "TRUE" | "yes"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let telegram_dry_run = parse_flag("TELEGRAM_DRY_RUN");
        let telegram_api_token = match var("TELEGRAM_API_TOKEN") {
            Some(token) => token,
            None if telegram_dry_run => String::new(),
            None => anyhow::bail!("TELEGRAM_API_TOKEN is not set"),
        };
        let telegram_channel_id =
            var("TELEGRAM_CHANNEL_ID").context("TELEGRAM_CHANNEL_ID is not set")?;

        let feed_sources = match var("FEED_SOURCES") {
            Some(raw) => parse_feed_sources(&raw).context("FEED_SOURCES is malformed")?,
            None => default_feed_sources(),
        };
        if feed_sources.is_empty() {
            anyhow::bail!("FEED_SOURCES does not name any feed");
        }

        let store_path = var("STORE_PATH").unwrap_or_else(|| "store".into());
        let retention_days = parse_var("RETENTION_DAYS", DEFAULT_RETENTION_DAYS)?;
        let retention_sweep_interval = match var("RETENTION_SWEEP_INTERVAL_SECS") {
            Some(_) => Some(Duration::from_secs(parse_var(
                "RETENTION_SWEEP_INTERVAL_SECS",
                0u64,
            )?)),
            None => None,
        }
        .filter(|interval| !interval.is_zero());

        let browserless_url = var("BROWSERLESS_URL");
        let browserless_token = var("BROWSERLESS_TOKEN");

        let max_delivery_attempts =
            parse_var("MAX_DELIVERY_ATTEMPTS", DEFAULT_MAX_DELIVERY_ATTEMPTS)?;
        let announce_interval = Duration::from_secs(parse_var(
            "ANNOUNCE_INTERVAL_SECS",
            DEFAULT_ANNOUNCE_INTERVAL.as_secs(),
        )?);
        let announce_message =
            var("ANNOUNCE_MESSAGE").unwrap_or_else(|| DEFAULT_ANNOUNCE_MESSAGE.into());
        let source_label = var("SOURCE_LABEL").unwrap_or_else(|| DEFAULT_SOURCE_LABEL.into());
        let read_more_label =
            var("READ_MORE_LABEL").unwrap_or_else(|| DEFAULT_READ_MORE_LABEL.into());

        Ok(Config {
            telegram_api_token,
            telegram_channel_id,
            telegram_dry_run,
            feed_sources,
            store_path,
            retention_days,
            retention_sweep_interval,
            browserless_url,
            browserless_token,
            max_delivery_attempts,
            announce_interval,
            announce_message,
            source_label,
            read_more_label,
        })
    }
}

/// Parses `name|url|interval_secs` entries separated by `;`.
pub fn parse_feed_sources(raw: &str) -> Result<Vec<FeedSource>> {
    raw.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let fields: Vec<&str> = part.split('|').map(str::trim).collect();
            let [name, url, secs] = fields.as_slice() else {
                anyhow::bail!("expected name|url|interval_secs, got {part:?}");
            };
            if !crate::feed::is_valid_link(url) {
                anyhow::bail!("feed url {url:?} is not an absolute URL");
            }
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("invalid interval for {name}: {secs:?}"))?;
            if secs == 0 {
                anyhow::bail!("interval for {name} must be positive");
            }
            Ok(FeedSource::new(*url, *name, Duration::from_secs(secs)))
        })
        .collect()
}

pub fn default_feed_sources() -> Vec<FeedSource> {
    vec![
        FeedSource::new("https://lenta.ru/rss/news", "lenta.ru", Duration::from_secs(300)),
        FeedSource::new(
            "https://ria.ru/export/rss2/archive/index.xml",
            "ria.ru",
            Duration::from_secs(600),
        ),
        FeedSource::new(
            "https://rssexport.rbc.ru/rbcnews/news/30/full.rss",
            "rbc.ru",
            Duration::from_secs(900),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_feed_sources() {
        let sources = parse_feed_sources(
            "lenta.ru|https://lenta.ru/rss/news|300; ria.ru | https://ria.ru/export/rss2/archive/index.xml | 600 ;",
        )
        .unwrap();

        assert_eq!(
            sources,
            vec![
                FeedSource::new("https://lenta.ru/rss/news", "lenta.ru", Duration::from_secs(300)),
                FeedSource::new(
                    "https://ria.ru/export/rss2/archive/index.xml",
                    "ria.ru",
                    Duration::from_secs(600)
                ),
            ]
        );
    }

    #[test]
    fn test_parse_feed_sources_rejects_bad_entries() {
        assert!(parse_feed_sources("lenta.ru|https://lenta.ru/rss/news").is_err());
        assert!(parse_feed_sources("lenta.ru|lenta.ru/rss|300").is_err());
        assert!(parse_feed_sources("lenta.ru|https://lenta.ru/rss/news|soon").is_err());
        assert!(parse_feed_sources("lenta.ru|https://lenta.ru/rss/news|0").is_err());
    }

    #[test]
    fn test_default_sources_have_staggered_intervals() {
        let intervals: Vec<u64> = default_feed_sources()
            .iter()
            .map(|s| s.interval.as_secs())
            .collect();
        assert_eq!(intervals, vec![300, 600, 900]);
    }
}
