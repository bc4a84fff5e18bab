use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const PARSE_MODE_HTML: &str = "HTML";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("telegram rejected the message (code {code}): {description}")]
    Rejected { code: u16, description: String },
}

/// Outbound channel for formatted posts. Injected into the pollers and the
/// announcer so tests can substitute a recording fake.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError>;
}

#[derive(Debug, Serialize)]
struct SendMessageParams<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    error_code: Option<u16>,
    description: Option<String>,
}

pub struct TelegramClient {
    client: Client,
    token: String,
    dry_run: bool,
}

impl TelegramClient {
    pub fn new(client: Client, token: &str) -> Self {
        Self {
            client,
            token: token.to_string(),
            dry_run: false,
        }
    }

    /// Logs every message instead of sending it.
    pub fn dry_run(client: Client) -> Self {
        Self {
            dry_run: true,
            ..Self::new(client, "")
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{TELEGRAM_API_BASE}/bot{}/{method}", self.token)
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError> {
        if self.dry_run {
            tracing::info!(%chat_id, "Mock message:\n{}", text);
            return Ok(());
        }

        let params = SendMessageParams {
            chat_id,
            text,
            parse_mode: PARSE_MODE_HTML,
        };

        let resp = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&params)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        match serde_json::from_str::<ApiResponse>(&body) {
            Ok(api) if api.ok => Ok(()),
            Ok(api) => Err(DeliveryError::Rejected {
                code: api.error_code.unwrap_or(status.as_u16()),
                description: api.description.unwrap_or_default(),
            }),
            Err(_) => Err(DeliveryError::Rejected {
                code: status.as_u16(),
                description: body,
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Records every delivery; fails while `fail_next` is above zero.
    #[derive(Default)]
    pub struct RecordingMessenger {
        pub sent: Mutex<Vec<(String, String)>>,
        pub fail_next: Mutex<usize>,
    }

    impl RecordingMessenger {
        pub fn failing(times: usize) -> Self {
            Self {
                fail_next: Mutex::new(times),
                ..Self::default()
            }
        }

        pub fn texts(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, text)| text.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError> {
            let mut fail_next = self.fail_next.lock().unwrap();
            if *fail_next > 0 {
                *fail_next -= 1;
                return Err(DeliveryError::Rejected {
                    code: 429,
                    description: "Too Many Requests: retry after 5".to_string(),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((chat_id.to_string(), text.to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_method_url() {
        let client = TelegramClient::new(Client::new(), "123:abc");
        assert_eq!(
            client.method_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_send_params_use_html_parse_mode() {
        let params = SendMessageParams {
            chat_id: "@channel",
            text: "<b>hi</b>",
            parse_mode: PARSE_MODE_HTML,
        };
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            serde_json::json!({"chat_id": "@channel", "text": "<b>hi</b>", "parse_mode": "HTML"})
        );
    }

    #[tokio::test]
    async fn test_dry_run_sends_nothing() {
        let client = TelegramClient::dry_run(Client::new());
        client.send_message("@channel", "hello").await.unwrap();
    }
}
