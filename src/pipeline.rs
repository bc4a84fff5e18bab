use std::sync::Arc;

use anyhow::Context;
use thiserror::Error;

use crate::constant::{DEFAULT_MAX_DELIVERY_ATTEMPTS, MAX_ARTICLES_PER_CYCLE};
use crate::dedup::DedupStore;
use crate::feed::{is_valid_link, FeedEntry, FeedError, FeedReader, FeedSource};
use crate::fetcher::ContentFetcher;
use crate::format::MessageFormatter;
use crate::store::Store;
use crate::telegram::{DeliveryError, Messenger};

/// Why a poll cycle ended early. The poller logs it and tries again after its interval.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("feed unavailable: {0}")]
    Feed(#[source] FeedError),

    #[error("store failure: {0:#}")]
    Store(#[from] anyhow::Error),

    #[error("delivery of {link} failed: {source}")]
    Delivery {
        link: String,
        #[source]
        source: DeliveryError,
    },
}

/// What one cycle saw and did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub entries: usize,
    pub invalid: usize,
    pub published: Vec<String>,
}

pub struct Pipeline<S: Store> {
    reader: Arc<dyn FeedReader>,
    fetcher: Arc<ContentFetcher>,
    formatter: MessageFormatter,
    messenger: Arc<dyn Messenger>,
    dedup: Arc<DedupStore<S>>,
    channel_id: String,
    max_per_cycle: usize,
    max_delivery_attempts: u32,
}

impl<S: Store> Pipeline<S> {
    pub fn dedup(&self) -> &Arc<DedupStore<S>> {
        &self.dedup
    }

    pub fn messenger(&self) -> &Arc<dyn Messenger> {
        &self.messenger
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// One pass over the source's entries, in feed order. Stops after
    /// `max_per_cycle` publications or at the first failed delivery.
    pub async fn run_cycle(&self, source: &FeedSource) -> Result<CycleReport, CycleError> {
        let mut report = CycleReport::default();

        let entries = match self.reader.entries(source).await {
            Ok(entries) => entries,
            Err(FeedError::Malformed(reason)) => {
                tracing::warn!(source = %source.name, url = %source.url, %reason, "Skipping malformed feed");
                return Ok(report);
            }
            Err(e) => return Err(CycleError::Feed(e)),
        };

        report.entries = entries.len();
        if entries.is_empty() {
            tracing::debug!(source = %source.name, "Feed has no entries");
            return Ok(report);
        }

        for entry in entries {
            if report.published.len() >= self.max_per_cycle {
                break;
            }

            if !is_valid_link(&entry.link) {
                tracing::warn!(source = %source.name, link = %entry.link, "Invalid link");
                report.invalid += 1;
                continue;
            }

            if !self.is_candidate(source, &entry).await? {
                continue;
            }

            if self.publish(source, &entry).await? {
                report.published.push(entry.link);
            }
        }

        Ok(report)
    }

    async fn is_candidate(&self, source: &FeedSource, entry: &FeedEntry) -> anyhow::Result<bool> {
        if self.dedup.is_published(&entry.link).await? {
            return Ok(false);
        }

        let attempts = self
            .dedup
            .get(&entry.link)
            .await?
            .map_or(0, |record| record.delivery_attempts);
        if attempts >= self.max_delivery_attempts {
            tracing::debug!(
                source = %source.name,
                link = %entry.link,
                attempts,
                "Delivery abandoned earlier; skipping"
            );
            return Ok(false);
        }

        Ok(true)
    }

    /// Enrich, record, deliver, mark. `Ok(false)` when there was nothing to publish.
    async fn publish(&self, source: &FeedSource, entry: &FeedEntry) -> Result<bool, CycleError> {
        let Some(article) = self.fetcher.fetch(&entry.link).await else {
            return Ok(false);
        };

        self.dedup
            .record_article(&entry.link, &entry.title, &source.name, &article.text)
            .await?;

        let message = self
            .formatter
            .format(&entry.title, &source.name, &article.text, &entry.link);

        if let Err(e) = self.messenger.send_message(&self.channel_id, &message).await {
            let attempts = self.dedup.record_delivery_failure(&entry.link).await?;
            if attempts >= self.max_delivery_attempts {
                tracing::error!(
                    source = %source.name,
                    link = %entry.link,
                    attempts,
                    "Giving up on article after repeated delivery failures"
                );
            }
            return Err(CycleError::Delivery {
                link: entry.link.clone(),
                source: e,
            });
        }

        tracing::info!(source = %source.name, title = %entry.title, "Published article");
        self.dedup.mark_published(&entry.link).await?;
        Ok(true)
    }
}

pub struct PipelineBuilder<S: Store> {
    dedup: Arc<DedupStore<S>>,
    messenger: Arc<dyn Messenger>,
    channel_id: String,
    reader: Option<Arc<dyn FeedReader>>,
    fetcher: Option<Arc<ContentFetcher>>,
    formatter: MessageFormatter,
    max_per_cycle: usize,
    max_delivery_attempts: u32,
}

impl<S: Store> PipelineBuilder<S> {
    pub fn new(
        dedup: Arc<DedupStore<S>>,
        messenger: Arc<dyn Messenger>,
        channel_id: impl Into<String>,
    ) -> Self {
        Self {
            dedup,
            messenger,
            channel_id: channel_id.into(),
            reader: None,
            fetcher: None,
            formatter: MessageFormatter::default(),
            max_per_cycle: MAX_ARTICLES_PER_CYCLE,
            max_delivery_attempts: DEFAULT_MAX_DELIVERY_ATTEMPTS,
        }
    }

    pub fn with_reader(mut self, reader: Arc<dyn FeedReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<ContentFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_formatter(mut self, formatter: MessageFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn max_per_cycle(mut self, max: usize) -> Self {
        self.max_per_cycle = max.max(1);
        self
    }

    pub fn max_delivery_attempts(mut self, max: u32) -> Self {
        self.max_delivery_attempts = max.max(1);
        self
    }

    pub fn build(self) -> anyhow::Result<Pipeline<S>> {
        let reader = self.reader.context("feed reader is not set")?;
        let fetcher = self.fetcher.context("content fetcher is not set")?;

        Ok(Pipeline {
            reader,
            fetcher,
            formatter: self.formatter,
            messenger: self.messenger,
            dedup: self.dedup,
            channel_id: self.channel_id,
            max_per_cycle: self.max_per_cycle,
            max_delivery_attempts: self.max_delivery_attempts,
        })
    }
}
