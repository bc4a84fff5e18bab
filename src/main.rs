mod announce;
mod config;
mod constant;
mod dedup;
mod feed;
mod fetcher;
mod format;
mod pipeline;
mod poller;
mod retry;
mod scheduler;
pub mod store;
mod telegram;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::Config;
use crate::constant::*;
use crate::dedup::DedupStore;
use crate::feed::rss::RssFeedReader;
use crate::fetcher::{BrowserlessRenderer, ContentFetcher, Extractor, HttpRenderer, Renderer};
use crate::format::MessageFormatter;
use crate::pipeline::PipelineBuilder;
use crate::retry::RetryPolicy;
use crate::scheduler::SchedulerBuilder;
use crate::store::LocalStore;
use crate::telegram::{Messenger, TelegramClient};

#[tokio::main]
async fn main() -> Result<()> {
    setup_env_and_tracing();

    let config = Config::from_env()?;
    tracing::info!(
        sources = config.feed_sources.len(),
        store = %config.store_path,
        dry_run = config.telegram_dry_run,
        "Configuration loaded"
    );

    let store = RetryPolicy::default()
        .run_sync("open store", || open_local_store(&config.store_path))
        .await?;
    let dedup = Arc::new(DedupStore::new(Arc::new(store)));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()?;

    let renderer: Arc<dyn Renderer> = match &config.browserless_url {
        Some(url) => {
            tracing::info!(%url, "Rendering pages with browserless");
            Arc::new(BrowserlessRenderer::new(
                client.clone(),
                url,
                config.browserless_token.as_deref(),
                RENDER_TIMEOUT,
            ))
        }
        None => Arc::new(HttpRenderer::new(client.clone(), RENDER_TIMEOUT)),
    };
    let fetcher = ContentFetcher::new(renderer, Extractor::from_selectors(CONTENT_SELECTORS)?);

    let messenger: Arc<dyn Messenger> = if config.telegram_dry_run {
        tracing::warn!("Telegram dry run enabled; messages are only logged");
        Arc::new(TelegramClient::dry_run(client.clone()))
    } else {
        Arc::new(TelegramClient::new(client.clone(), &config.telegram_api_token))
    };

    let pipeline = PipelineBuilder::new(dedup, messenger, &config.telegram_channel_id)
        .with_reader(Arc::new(RssFeedReader::new(client)))
        .with_fetcher(Arc::new(fetcher))
        .with_formatter(MessageFormatter::new(
            MAX_BODY_CHARS,
            &config.source_label,
            &config.read_more_label,
        ))
        .max_per_cycle(MAX_ARTICLES_PER_CYCLE)
        .max_delivery_attempts(config.max_delivery_attempts)
        .build()?;

    SchedulerBuilder::new(pipeline)
        .with_sources(config.feed_sources.clone())
        .with_announcement(config.announce_message.clone(), config.announce_interval)
        .retention_days(config.retention_days)
        .sweep_every(config.retention_sweep_interval)
        .build()
        .run()
        .await
}

#[cfg(feature = "rocks")]
fn open_local_store(path: &str) -> Result<LocalStore> {
    LocalStore::open(path)
}

#[cfg(not(feature = "rocks"))]
fn open_local_store(path: &str) -> Result<LocalStore> {
    tracing::warn!(%path, "Built without the rocks feature; using an in-memory store");
    Ok(LocalStore::new())
}

pub fn setup_env_and_tracing() {
    dotenv::dotenv().ok();
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
