use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constant::{ARTICLES_PREFIX, SCHEMA_PREFIX, SCHEMA_VERSION};
use crate::retry::RetryPolicy;
use crate::store::{Store, StoreMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: u64,
    pub link: String,
    pub title: String,
    pub source: String,
    pub content: String,
    pub first_seen: DateTime<Utc>,
    pub posted: bool,
    /// Number of failed deliveries so far.
    pub delivery_attempts: u32,
}

impl ArticleRecord {
    pub fn new(link: &str, title: &str, source: &str, content: &str) -> Self {
        Self {
            id: 0,
            link: link.to_string(),
            title: title.to_string(),
            source: source.to_string(),
            content: content.to_string(),
            first_seen: Utc::now(),
            posted: false,
            delivery_attempts: 0,
        }
    }
}

pub struct DedupStore<S: Store> {
    articles: StoreMap<String, ArticleRecord, S>,
    meta: StoreMap<String, u64, S>,
    next_id: AtomicU64,
    retry: RetryPolicy,
}

impl<S: Store> DedupStore<S> {
    const SCHEMA_VERSION_KEY: &'static str = "version";

    pub fn new(store: Arc<S>) -> Self {
        Self::with_retry(store, RetryPolicy::default())
    }

    pub fn with_retry(store: Arc<S>, retry: RetryPolicy) -> Self {
        Self {
            articles: S::open_map(&store, ARTICLES_PREFIX),
            meta: S::open_map(&store, SCHEMA_PREFIX),
            next_id: AtomicU64::new(1),
            retry,
        }
    }

    /// Checks the schema version and seeds the id sequence.
    pub async fn ensure_schema(&self) -> Result<()> {
        let key = Self::SCHEMA_VERSION_KEY.to_string();
        let version = self
            .retry
            .run_sync("read schema version", || self.meta.get(&key))
            .await?;

        match version {
            Some(v) if v == SCHEMA_VERSION as u64 => {}
            Some(v) => anyhow::bail!(
                "store schema version {v} is not supported (expected {SCHEMA_VERSION})"
            ),
            None => {
                self.retry
                    .run_sync("write schema version", || {
                        self.meta.insert(&key, &(SCHEMA_VERSION as u64))
                    })
                    .await?;
                tracing::info!("Created {ARTICLES_PREFIX} table (schema v{SCHEMA_VERSION})");
            }
        }

        let max_id = self
            .retry
            .run_sync("scan article ids", || {
                Ok(self.articles.iter().map(|(_, r)| r.id).max().unwrap_or(0))
            })
            .await?;
        self.next_id.fetch_max(max_id + 1, Ordering::SeqCst);

        tracing::info!("Published articles table ready");
        Ok(())
    }

    pub async fn get(&self, link: &str) -> Result<Option<ArticleRecord>> {
        let key = link.to_string();
        self.retry
            .run_sync("load article", || self.articles.get(&key))
            .await
    }

    /// True only for a stored record whose delivery succeeded.
    pub async fn is_published(&self, link: &str) -> Result<bool> {
        Ok(self.get(link).await?.is_some_and(|r| r.posted))
    }

    pub async fn record_article(
        &self,
        link: &str,
        title: &str,
        source: &str,
        content: &str,
    ) -> Result<bool> {
        self.insert_record(ArticleRecord::new(link, title, source, content))
            .await
    }

    pub async fn insert_record(&self, mut record: ArticleRecord) -> Result<bool> {
        record.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let key = record.link.clone();
        let inserted = self
            .retry
            .run_sync("insert article", || {
                self.articles.insert_if_absent(&key, &record)
            })
            .await?;

        if inserted {
            tracing::debug!(link = %key, id = record.id, "Recorded article");
        }
        Ok(inserted)
    }

    pub async fn mark_published(&self, link: &str) -> Result<()> {
        let key = link.to_string();
        self.retry
            .run_sync("mark article published", || {
                self.articles.update(&key, |mut record| {
                    (!record.posted).then(|| {
                        record.posted = true;
                        record
                    })
                })?;
                Ok(())
            })
            .await
    }

    /// Returns the new attempt count, or 0 when the link has no record.
    pub async fn record_delivery_failure(&self, link: &str) -> Result<u32> {
        let key = link.to_string();
        self.retry
            .run_sync("record delivery failure", || {
                let updated = self.articles.update(&key, |mut record| {
                    record.delivery_attempts = record.delivery_attempts.saturating_add(1);
                    Some(record)
                })?;
                Ok(updated.map_or(0, |record| record.delivery_attempts))
            })
            .await
    }

    /// Deletes every record with `first_seen < cutoff`, posted or not.
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.retry
            .run_sync("purge old articles", || {
                let expired: Vec<String> = self
                    .articles
                    .iter()
                    .filter(|(_, record)| record.first_seen < cutoff)
                    .map(|(link, _)| link)
                    .collect();

                for link in &expired {
                    self.articles.remove(link)?;
                }
                Ok(expired.len())
            })
            .await
    }

    pub async fn sweep(&self, days: i64) -> Result<usize> {
        let cutoff = Utc::now() - chrono::Duration::days(days);
        let removed = self.purge_older_than(cutoff).await?;
        tracing::info!(removed, "Removed records older than {days} days");
        Ok(removed)
    }
}
