use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("render API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl RenderError {
    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            RenderError::Timeout(timeout)
        } else {
            RenderError::Network(err.to_string())
        }
    }
}

/// Turns a page URL into HTML.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String, RenderError>;
}

/// Renders pages in headless Chromium through a Browserless `/content` endpoint.
/// Navigation resolves once the DOM is loaded; it does not wait for network idle.
pub struct BrowserlessRenderer {
    client: Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl BrowserlessRenderer {
    pub fn new(client: Client, base_url: &str, token: Option<&str>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            timeout,
        }
    }

    fn endpoint(&self) -> String {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }
}

#[async_trait]
impl Renderer for BrowserlessRenderer {
    async fn render(&self, url: &str) -> Result<String, RenderError> {
        let body = serde_json::json!({
            "url": url,
            "gotoOptions": {
                "waitUntil": "domcontentloaded",
                "timeout": self.timeout.as_millis() as u64,
            },
        });

        let resp = self
            .client
            .post(self.endpoint())
            .timeout(self.timeout + Duration::from_secs(5))
            .json(&body)
            .send()
            .await
            .map_err(|e| RenderError::from_reqwest(e, self.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RenderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        resp.text()
            .await
            .map_err(|e| RenderError::from_reqwest(e, self.timeout))
    }
}

/// Plain GET without script execution. Enough for server-rendered news sites.
pub struct HttpRenderer {
    client: Client,
    timeout: Duration,
}

impl HttpRenderer {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, url: &str) -> Result<String, RenderError> {
        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RenderError::from_reqwest(e, self.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RenderError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        resp.text()
            .await
            .map_err(|e| RenderError::from_reqwest(e, self.timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browserless_endpoint_carries_token() {
        let renderer = BrowserlessRenderer::new(
            Client::new(),
            "http://browserless:3000/",
            Some("secret"),
            Duration::from_secs(30),
        );
        assert_eq!(
            renderer.endpoint(),
            "http://browserless:3000/content?token=secret"
        );

        let anonymous =
            BrowserlessRenderer::new(Client::new(), "http://browserless:3000", None, Duration::from_secs(30));
        assert_eq!(anonymous.endpoint(), "http://browserless:3000/content");
    }
}
