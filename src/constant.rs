use std::time::Duration;

pub const STORE_MAX_ATTEMPTS: usize = 3;
pub const STORE_RETRY_DELAY: Duration = Duration::from_secs(5);

pub const RENDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Hard cutoff for the article body, counted in characters.
pub const MAX_BODY_CHARS: usize = 3072;

/// Pacing: at most this many new articles per source per poll interval.
pub const MAX_ARTICLES_PER_CYCLE: usize = 1;

pub const DEFAULT_MAX_DELIVERY_ATTEMPTS: u32 = 10;
pub const DEFAULT_RETENTION_DAYS: i64 = 30;
pub const DEFAULT_ANNOUNCE_INTERVAL: Duration = Duration::from_secs(1800);

/// Content containers, most specific first. The first one present wins.
pub const CONTENT_SELECTORS: &[&str] = &[
    "div.article__text",
    "div.content",
    "div.topic-body__content",
];

/// Tags the Telegram HTML parse mode understands.
pub const ALLOWED_TAGS: &[&str] = &["b", "i", "u", "a", "code", "pre"];

pub const DEFAULT_SOURCE_LABEL: &str = "Source";
pub const DEFAULT_READ_MORE_LABEL: &str = "Read the full story on the site";

pub const DEFAULT_ANNOUNCE_MESSAGE: &str = "<b>Welcome!</b>\n\
<i>This channel relays fresh headlines from a curated set of news feeds.</i>\n\
<i>Every story links back to its original source.</i>";

pub const ARTICLES_PREFIX: &str = "published_articles";
pub const SCHEMA_PREFIX: &str = "schema_meta";
pub const SCHEMA_VERSION: u32 = 1;
