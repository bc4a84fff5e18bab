use std::sync::Arc;

use crate::feed::FeedSource;
use crate::pipeline::{CycleReport, Pipeline};
use crate::store::Store;

/// Drives one feed forever: a cycle, then a sleep for the source's interval.
/// Cycles of the same source never overlap.
pub struct SourcePoller<S: Store> {
    source: FeedSource,
    pipeline: Arc<Pipeline<S>>,
}

impl<S: Store> Clone for SourcePoller<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

impl<S: Store> SourcePoller<S> {
    pub fn new(source: FeedSource, pipeline: Arc<Pipeline<S>>) -> Self {
        Self { source, pipeline }
    }

    pub fn source(&self) -> &FeedSource {
        &self.source
    }

    /// Runs one cycle and logs its outcome. Never fails.
    pub async fn poll_once(&self) -> Option<CycleReport> {
        match self.pipeline.run_cycle(&self.source).await {
            Ok(report) => {
                tracing::debug!(
                    source = %self.source.name,
                    entries = report.entries,
                    invalid = report.invalid,
                    published = report.published.len(),
                    "Poll cycle finished"
                );
                Some(report)
            }
            Err(e) => {
                tracing::error!(source = %self.source.name, error = %e, "Error while processing feed");
                None
            }
        }
    }

    pub async fn run(self) {
        tracing::info!(
            source = %self.source.name,
            url = %self.source.url,
            interval = ?self.source.interval,
            "Starting source poller"
        );

        loop {
            self.poll_once().await;
            tokio::time::sleep(self.source.interval).await;
        }
    }
}
