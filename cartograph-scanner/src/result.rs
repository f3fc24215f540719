use serde::Serialize;
use std::collections::BTreeMap;
use url::Url;

/// What a single successfully parsed page links to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageResult {
    #[serde(skip)]
    pub url: Url,
    pub internal_links: Vec<Url>,
    pub external_links: Vec<Url>,
    pub assets: Vec<Url>,
    /// Retries the page needed before it was fetched.
    #[serde(skip)]
    pub attempts: u32,
}

impl PageResult {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            internal_links: Vec::new(),
            external_links: Vec::new(),
            assets: Vec::new(),
            attempts: 0,
        }
    }
}

/// Every page reached during a crawl, keyed by canonical URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SiteMap {
    pages: BTreeMap<String, PageResult>,
}

impl SiteMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a page. Returns `false` and keeps the existing entry if the URL
    /// is already present.
    pub fn insert(&mut self, page: PageResult) -> bool {
        let key = page.url.as_str().to_string();
        if self.pages.contains_key(&key) {
            return false;
        }
        self.pages.insert(key, page);
        true
    }

    pub fn get(&self, url: &str) -> Option<&PageResult> {
        self.pages.get(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.pages.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Pages in URL order.
    pub fn pages(&self) -> impl Iterator<Item = &PageResult> {
        self.pages.values()
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }
}

/// Counters collected while crawling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub pages_crawled: usize,
    pub fetch_failures: usize,
    pub retries: usize,
    pub abandoned: usize,
    pub parse_failures: usize,
}

/// Everything a finished (or cancelled) crawl produced.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlOutcome {
    pub start_url: Url,
    pub site_map: SiteMap,
    /// External links in the order workers reported them; may repeat.
    pub dead_links: Vec<Url>,
    pub stats: CrawlStats,
    pub cancelled: bool,
}

impl CrawlOutcome {
    /// External links sorted and de-duplicated.
    pub fn unique_dead_links(&self) -> Vec<&Url> {
        let mut links: Vec<&Url> = self.dead_links.iter().collect();
        links.sort();
        links.dedup();
        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str) -> PageResult {
        PageResult::new(Url::parse(url).unwrap())
    }

    #[test]
    fn test_insert_rejects_duplicate() {
        let mut site_map = SiteMap::new();
        let mut first = page("http://x/a");
        first.internal_links.push(Url::parse("http://x/b").unwrap());

        assert!(site_map.insert(first.clone()));
        assert!(!site_map.insert(page("http://x/a")));
        assert_eq!(site_map.len(), 1);
        assert_eq!(site_map.get("http://x/a"), Some(&first));
    }

    #[test]
    fn test_serializes_keys_only() {
        let mut site_map = SiteMap::new();
        let mut index = page("http://x/index.html");
        index.internal_links.push(Url::parse("http://x/about.html").unwrap());
        index.attempts = 2;
        site_map.insert(index);

        let json = serde_json::to_value(&site_map).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "pages": {
                    "http://x/index.html": {
                        "internal_links": ["http://x/about.html"],
                        "external_links": [],
                        "assets": []
                    }
                }
            })
        );
    }

    #[test]
    fn test_unique_dead_links() {
        let link = |s: &str| Url::parse(s).unwrap();
        let outcome = CrawlOutcome {
            start_url: link("http://x/"),
            site_map: SiteMap::new(),
            dead_links: vec![link("https://b.com/"), link("https://a.com/"), link("https://b.com/")],
            stats: CrawlStats::default(),
            cancelled: false,
        };

        let unique: Vec<&str> = outcome.unique_dead_links().into_iter().map(Url::as_str).collect();
        assert_eq!(unique, vec!["https://a.com/", "https://b.com/"]);
    }
}
