//! DOM-walking article extractor

use crate::config::ExtractionConfig;
use crate::crawler::RawPage;
use crate::extractor::{is_markup_content_type, ExtractError, ExtractedContent, Extractor, ImageRef};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;

/// Elements whose subtrees never contribute body text
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "nav", "footer"];

const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// Extracts title, metadata, main content and images by walking the parsed
/// document
///
/// # Example
///
/// ```
/// use scrape_pipeline::config::ExtractionConfig;
/// use scrape_pipeline::DomExtractor;
///
/// let extractor = DomExtractor::new(ExtractionConfig::default());
/// let content = extractor.extract_html(
///     "https://example.com/post",
///     "<title>Hello</title><article><p>One two</p></article>",
/// );
/// assert_eq!(content.title, "Hello");
/// assert_eq!(content.word_count, 2);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DomExtractor {
    config: ExtractionConfig,
}

impl DomExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Extracts content from an HTML string without content-type checks
    pub fn extract_html(&self, url: &str, html: &str) -> ExtractedContent {
        let document = Html::parse_document(html);

        let mut metadata = BTreeMap::new();
        let title = extract_title(&document).unwrap_or_default();
        if !title.is_empty() {
            metadata.insert("title".to_string(), title.clone());
        }
        extract_metadata(&document, &mut metadata);

        let body = self.extract_main_content(&document);

        let images = if self.config.extract_images {
            extract_images(&document)
        } else {
            Vec::new()
        };

        let word_count = body.split_whitespace().count();

        ExtractedContent {
            url: url.to_string(),
            title,
            body,
            metadata,
            images,
            word_count,
        }
    }

    /// Serializes the first `main` or `article` element
    fn extract_main_content(&self, document: &Html) -> String {
        let mut out = String::new();

        let root = first_match(document, "main, article").or_else(|| first_match(document, "article"));
        if let Some(root) = root {
            self.write_node_text(root, &mut out, true);
        }

        out
    }

    fn write_node_text(&self, element: ElementRef<'_>, out: &mut String, is_root: bool) {
        let name = element.value().name();

        if SKIPPED_ELEMENTS.contains(&name) {
            return;
        }

        if HEADINGS.contains(&name) {
            if self.config.preserve_headings {
                out.push_str("\n\n");
                for child in element.children() {
                    if let Some(text) = child.value().as_text() {
                        push_text(out, text);
                    }
                }
                out.push('\n');
            }
            return;
        }

        match name {
            "p" => {
                if !is_root {
                    out.push_str("\n\n");
                }
                self.write_children(element, out);
                out.push('\n');
            }
            "br" => out.push('\n'),
            "li" => {
                out.push_str("\n- ");
                self.write_children(element, out);
            }
            _ => self.write_children(element, out),
        }
    }

    fn write_children(&self, element: ElementRef<'_>, out: &mut String) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                push_text(out, text);
            } else if let Some(child) = ElementRef::wrap(child) {
                self.write_node_text(child, out, false);
            }
        }
    }
}

impl Extractor for DomExtractor {
    fn extract(&self, page: &RawPage) -> Result<ExtractedContent, ExtractError> {
        if !is_markup_content_type(&page.content_type) {
            return Err(ExtractError::NotHtml {
                url: page.url.clone(),
                content_type: page.content_type.clone(),
            });
        }

        if page.body.contains('\0') {
            return Err(ExtractError::Unparseable {
                url: page.url.clone(),
                reason: "body contains binary data".to_string(),
            });
        }

        Ok(self.extract_html(&page.url, &page.body))
    }
}

/// Appends trimmed text followed by a space, skipping blank text
fn push_text(out: &mut String, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        out.push_str(text);
        out.push(' ');
    }
}

fn first_match<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    let first = document.select(&selector).next();
    first
}

/// The first `title` element's leading text child, verbatim
fn extract_title(document: &Html) -> Option<String> {
    let title = first_match(document, "title")?;
    let first = title.children().next()?;
    first.value().as_text().map(|text| text.to_string())
}

fn extract_metadata(document: &Html, metadata: &mut BTreeMap<String, String>) {
    let Ok(selector) = Selector::parse("meta") else {
        return;
    };

    for meta in document.select(&selector) {
        let attr = |key: &str| meta.value().attr(key).unwrap_or_default();
        let (name, property, content) = (attr("name"), attr("property"), attr("content"));

        if content.is_empty() {
            continue;
        }

        if !name.is_empty() {
            metadata.insert(name.to_string(), content.to_string());
        } else if property.starts_with("og:") {
            metadata.insert(property.to_string(), content.to_string());
        } else if property == "article:published_time" {
            metadata.insert("published_time".to_string(), content.to_string());
        }
    }
}

fn extract_images(document: &Html) -> Vec<ImageRef> {
    let Ok(selector) = Selector::parse("img") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|img| {
            let src = img.value().attr("src").unwrap_or_default();
            if src.is_empty() {
                return None;
            }
            Some(ImageRef {
                url: src.to_string(),
                alt: img.value().attr("alt").unwrap_or_default().to_string(),
            })
        })
        .collect()
}
