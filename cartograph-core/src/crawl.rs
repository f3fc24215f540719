use cartograph_scanner::crawler::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BACKOFF};
use cartograph_scanner::{CancellationToken, CrawlOutcome, Crawler, ScanError};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

/// Options for configuring a crawl operation
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub url: String,
    pub threads: usize,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
    pub show_progress_bars: bool,
}

impl CrawlOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            threads: 10,
            timeout_secs: 10,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            show_progress_bars: false,
        }
    }
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Build an HTTP crawler from `options` and run it.
pub async fn execute_crawl(
    options: CrawlOptions,
    cancel: CancellationToken,
) -> Result<CrawlOutcome, ScanError> {
    let crawler = Crawler::with_timeout(options.timeout_secs)?;
    execute_crawl_with(crawler, options, cancel).await
}

/// Run a crawl on an already-built crawler, applying the retry and progress
/// settings from `options`.
pub async fn execute_crawl_with(
    crawler: Crawler,
    options: CrawlOptions,
    cancel: CancellationToken,
) -> Result<CrawlOutcome, ScanError> {
    let CrawlOptions {
        url,
        threads,
        max_attempts,
        retry_backoff,
        show_progress_bars,
        ..
    } = options;

    // Single spinner for overall crawl progress (only if enabled)
    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting crawl...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let processed_count = Arc::new(AtomicUsize::new(0));

    let count_clone = processed_count.clone();
    let pb_clone = progress_bar.clone();
    let worker_progress: cartograph_scanner::ProgressCallback =
        Arc::new(move |worker_id: usize, page: String| {
            let count = count_clone.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(ref pb) = pb_clone {
                pb.set_message(format!(
                    "Crawling... {} pages processed (worker {}: {})",
                    count,
                    worker_id,
                    extract_url_path(&page)
                ));
            }
        });

    let crawler = crawler
        .with_max_attempts(max_attempts)
        .with_retry_backoff(retry_backoff)
        .with_cancellation(cancel)
        .with_progress_callback(worker_progress);

    let result = crawler.crawl(&url, threads).await;

    if let Some(ref pb) = progress_bar {
        match &result {
            Ok(outcome) if outcome.cancelled => pb.finish_with_message(format!(
                "Crawl cancelled. {} pages mapped",
                outcome.site_map.len()
            )),
            Ok(outcome) => pb.finish_with_message(format!(
                "Crawl complete! {} pages mapped",
                outcome.site_map.len()
            )),
            Err(_) => pb.finish_and_clear(),
        }
    }

    result
}
