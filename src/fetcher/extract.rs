use scraper::{ElementRef, Html, Node, Selector};

/// What a strategy pulls out of a page: the matched markup and its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub fragment: String,
    pub text: String,
}

pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// `None` when the strategy finds nothing usable in the document.
    fn extract(&self, document: &Html) -> Option<Extracted>;
}

/// Takes the first element matching a CSS selector.
pub struct SelectorStrategy {
    css: String,
    selector: Selector,
}

impl SelectorStrategy {
    pub fn new(css: &str) -> anyhow::Result<Self> {
        let selector = Selector::parse(css)
            .map_err(|e| anyhow::anyhow!("invalid content selector {css:?}: {e:?}"))?;
        Ok(Self {
            css: css.to_string(),
            selector,
        })
    }
}

impl ExtractionStrategy for SelectorStrategy {
    fn name(&self) -> &str {
        &self.css
    }

    fn extract(&self, document: &Html) -> Option<Extracted> {
        let element = document.select(&self.selector).next()?;
        let text = block_text(element);

        if text.is_empty() {
            return None;
        }

        Some(Extracted {
            fragment: element.html(),
            text,
        })
    }
}

/// Block elements start a new line in the extracted text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p",
    "pre", "section", "table", "td", "th", "tr", "ul",
];

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Plain text of an element: inline runs are concatenated as written,
/// whitespace is collapsed, and one line is produced per block.
fn block_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);

    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
            }
            Node::Element(el) if SKIPPED_ELEMENTS.contains(&el.name()) => {}
            Node::Element(el) => {
                let block = BLOCK_ELEMENTS.contains(&el.name());
                if block {
                    out.push('\n');
                }
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Strategies tried in order; the first one with a result wins and nothing is merged.
pub struct Extractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Extractor {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn from_selectors(selectors: &[&str]) -> anyhow::Result<Self> {
        let strategies = selectors
            .iter()
            .map(|css| {
                SelectorStrategy::new(css).map(|s| Box::new(s) as Box<dyn ExtractionStrategy>)
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self::new(strategies))
    }

    pub fn extract(&self, html: &str) -> Option<Extracted> {
        let document = Html::parse_document(html);
        self.strategies.iter().find_map(|strategy| {
            let found = strategy.extract(&document);
            if found.is_some() {
                tracing::trace!(strategy = strategy.name(), "Content matched");
            }
            found
        })
    }
}
