use crate::error::Result;
use scraper::{Html, Selector};
use serde::Serialize;
use tracing::trace;
use url::Url;

/// Links and assets found on a single page, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageLinks {
    pub internal_links: Vec<Url>,
    pub external_links: Vec<Url>,
    pub assets: Vec<Url>,
}

/// Turns a fetched page body into the links it references.
pub trait LinkExtractor: Send + Sync {
    fn extract(&self, page_url: &Url, body: &[u8]) -> Result<PageLinks>;
}

/// Extracts `<a href>` links plus `<link href>`, `<script src>` and
/// `<img src>` assets from an HTML document.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlExtractor;

impl LinkExtractor for HtmlExtractor {
    fn extract(&self, page_url: &Url, body: &[u8]) -> Result<PageLinks> {
        // Legacy encodings still carry ASCII markup, so decode lossily.
        let html = String::from_utf8_lossy(body);
        Ok(extract_links(page_url, &html))
    }
}

/// Parse `html` and classify every reference relative to `page_url`.
pub fn extract_links(page_url: &Url, html: &str) -> PageLinks {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href], link[href], script[src], img[src]").unwrap();

    let mut links = PageLinks::default();

    for element in document.select(&selector) {
        let element = element.value();
        let (raw, is_anchor) = match element.name() {
            "a" => (element.attr("href"), true),
            "link" => (element.attr("href"), false),
            _ => (element.attr("src"), false),
        };
        let Some(resolved) = raw.and_then(|raw| resolve(page_url, raw)) else {
            continue;
        };

        if !is_anchor {
            links.assets.push(resolved);
        } else if is_same_host(page_url, &resolved) {
            trace!("Internal link: {}", resolved);
            links.internal_links.push(resolved);
        } else {
            trace!("External link: {}", resolved);
            links.external_links.push(resolved);
        }
    }

    links
}

fn resolve(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    // Skip empty, in-page anchors and non-navigational schemes
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    base.join(href).ok()
}

/// Host and explicit port must both match.
pub fn is_same_host(page_url: &Url, link: &Url) -> bool {
    link.host_str().is_some()
        && link.host_str() == page_url.host_str()
        && link.port() == page_url.port()
}
