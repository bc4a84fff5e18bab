use std::sync::Arc;
use std::time::Duration;

use crate::telegram::Messenger;

/// Posts a fixed welcome message to the channel on a fixed cadence.
pub struct Announcer {
    messenger: Arc<dyn Messenger>,
    channel_id: String,
    message: String,
    interval: Duration,
}

impl Announcer {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        channel_id: impl Into<String>,
        message: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            messenger,
            channel_id: channel_id.into(),
            message: message.into(),
            interval,
        }
    }

    pub async fn run(self) {
        loop {
            match self
                .messenger
                .send_message(&self.channel_id, &self.message)
                .await
            {
                Ok(()) => tracing::info!("Periodic announcement sent to channel"),
                Err(e) => tracing::error!(error = %e, "Failed to send periodic announcement"),
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}
