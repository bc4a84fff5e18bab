pub mod extract;
pub mod render;

use std::sync::Arc;

pub use extract::{Extracted, ExtractionStrategy, Extractor, SelectorStrategy};
pub use render::{BrowserlessRenderer, HttpRenderer, RenderError, Renderer};

pub struct ContentFetcher {
    renderer: Arc<dyn Renderer>,
    extractor: Extractor,
}

impl ContentFetcher {
    pub fn new(renderer: Arc<dyn Renderer>, extractor: Extractor) -> Self {
        Self {
            renderer,
            extractor,
        }
    }

    pub async fn fetch(&self, url: &str) -> Option<Extracted> {
        let html = match self.renderer.render(url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::error!(%url, error = %e, "Failed to load article");
                return None;
            }
        };

        let extracted = self.extractor.extract(&html);
        if extracted.is_none() {
            tracing::warn!(%url, "No content found on page");
        }
        extracted
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::constant::CONTENT_SELECTORS;

    /// Serves canned pages; unknown URLs time out.
    #[derive(Default)]
    pub struct FakeRenderer {
        pages: Mutex<HashMap<String, String>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeRenderer {
        pub fn with_article(self, url: &str, text: &str) -> Self {
            self.pages.lock().unwrap().insert(
                url.to_string(),
                format!(r#"<html><body><div class="article__text"><p>{text}</p></div></body></html>"#),
            );
            self
        }

        pub fn with_page(self, url: &str, html: &str) -> Self {
            self.pages
                .lock()
                .unwrap()
                .insert(url.to_string(), html.to_string());
            self
        }
    }

    #[async_trait]
    impl Renderer for FakeRenderer {
        async fn render(&self, url: &str) -> Result<String, RenderError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.pages
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or(RenderError::Timeout(Duration::from_secs(30)))
        }
    }

    fn fetcher(renderer: FakeRenderer) -> ContentFetcher {
        ContentFetcher::new(
            Arc::new(renderer),
            Extractor::from_selectors(CONTENT_SELECTORS).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_fetch_returns_fragment_and_text() {
        let fetcher = fetcher(FakeRenderer::default().with_article("https://a.example/1", "Body text"));

        let found = fetcher.fetch("https://a.example/1").await.unwrap();
        assert_eq!(found.text, "Body text");
        assert!(found.fragment.contains("<p>Body text</p>"));
    }

    #[tokio::test]
    async fn test_render_failure_is_an_empty_result() {
        let fetcher = fetcher(FakeRenderer::default());
        assert!(fetcher.fetch("https://a.example/missing").await.is_none());
    }

    #[tokio::test]
    async fn test_page_without_content_is_an_empty_result() {
        let fetcher = fetcher(
            FakeRenderer::default()
                .with_page("https://a.example/2", "<html><body><nav>menu</nav></body></html>"),
        );
        assert!(fetcher.fetch("https://a.example/2").await.is_none());
    }
}
