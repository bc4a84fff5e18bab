use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinSet;

use crate::announce::Announcer;
use crate::constant::DEFAULT_RETENTION_DAYS;
use crate::dedup::DedupStore;
use crate::feed::FeedSource;
use crate::pipeline::Pipeline;
use crate::poller::SourcePoller;
use crate::store::Store;

/// Delay before a crashed poller is started again.
const RESTART_DELAY: Duration = Duration::from_secs(5);

/// Owns every long-running task: one poller per source, the announcer and the
/// optional periodic retention sweep.
pub struct Scheduler<S: Store> {
    pipeline: Arc<Pipeline<S>>,
    sources: Vec<FeedSource>,
    announcer: Option<Announcer>,
    retention_days: i64,
    sweep_interval: Option<Duration>,
}

impl<S: Store> Scheduler<S> {
    /// Prepares the store, then runs all tasks until every one of them has exited.
    pub async fn run(self) -> Result<()> {
        let dedup = Arc::clone(self.pipeline.dedup());
        dedup.ensure_schema().await?;
        dedup.sweep(self.retention_days).await?;

        tracing::info!(sources = self.sources.len(), "Bot started");

        let mut tasks = JoinSet::new();
        for source in self.sources {
            let poller = SourcePoller::new(source, Arc::clone(&self.pipeline));
            tasks.spawn(supervise(poller));
        }
        if let Some(announcer) = self.announcer {
            tasks.spawn(announcer.run());
        }
        if let Some(interval) = self.sweep_interval {
            tasks.spawn(sweep_periodically(dedup, self.retention_days, interval));
        }

        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(()) => tracing::warn!(remaining = tasks.len(), "Task exited"),
                Err(e) => tracing::error!(remaining = tasks.len(), error = %e, "Task failed"),
            }
        }

        tracing::warn!("All tasks exited");
        Ok(())
    }
}

/// Restarts the poller after a panic. Dropping this task drops `running`,
/// which aborts the poller.
async fn supervise<S: Store>(poller: SourcePoller<S>) {
    let mut running = JoinSet::new();
    loop {
        running.spawn(poller.clone().run());
        match running.join_next().await {
            Some(Err(e)) if e.is_panic() => {
                tracing::error!(source = %poller.source().name, "Poller panicked; restarting");
                tokio::time::sleep(RESTART_DELAY).await;
            }
            _ => return,
        }
    }
}

async fn sweep_periodically<S: Store>(dedup: Arc<DedupStore<S>>, days: i64, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        if let Err(e) = dedup.sweep(days).await {
            tracing::error!(error = %e, "Retention sweep failed");
        }
    }
}

pub struct SchedulerBuilder<S: Store> {
    pipeline: Arc<Pipeline<S>>,
    sources: Vec<FeedSource>,
    announcer: Option<Announcer>,
    retention_days: i64,
    sweep_interval: Option<Duration>,
}

impl<S: Store> SchedulerBuilder<S> {
    pub fn new(pipeline: Pipeline<S>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            sources: vec![],
            announcer: None,
            retention_days: DEFAULT_RETENTION_DAYS,
            sweep_interval: None,
        }
    }

    pub fn with_sources(mut self, sources: impl IntoIterator<Item = FeedSource>) -> Self {
        self.sources.extend(sources);
        self
    }

    /// Announces `message` on the pipeline's channel every `interval`.
    pub fn with_announcement(mut self, message: impl Into<String>, interval: Duration) -> Self {
        self.announcer = Some(Announcer::new(
            Arc::clone(self.pipeline.messenger()),
            self.pipeline.channel_id(),
            message,
            interval,
        ));
        self
    }

    pub fn retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }

    pub fn sweep_every(mut self, interval: Option<Duration>) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn build(self) -> Scheduler<S> {
        Scheduler {
            pipeline: self.pipeline,
            sources: self.sources,
            announcer: self.announcer,
            retention_days: self.retention_days,
            sweep_interval: self.sweep_interval,
        }
    }
}
