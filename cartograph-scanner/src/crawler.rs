use crate::canonical::{canonicalize, normalize};
use crate::error::{Result, ScanError};
use crate::extract::{HtmlExtractor, LinkExtractor};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::frontier::Frontier;
use crate::queue::{Job, Message, WorkQueue};
use crate::result::{CrawlOutcome, CrawlStats, PageResult, SiteMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(10);

/// Maps a single site with a fixed pool of workers sharing one queue.
pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    max_attempts: u32,
    retry_backoff: Duration,
    cancel: CancellationToken,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            extractor: Arc::new(HtmlExtractor),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            cancel: CancellationToken::new(),
            progress_callback: None,
        }
    }

    /// Crawler fetching over HTTP with the given request timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpFetcher::new(timeout_secs)?)))
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn LinkExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Total fetch attempts per page, including the first. Clamped to at least 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Delay before the first retry; doubles on each further attempt.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Crawl every page reachable from `start_url` on the same host.
    ///
    /// Returns once the queue has drained, or early with `cancelled` set if
    /// the cancellation token fires; in that case the site map holds whatever
    /// pages finished before the stop.
    pub async fn crawl(&self, start_url: &str, workers: usize) -> Result<CrawlOutcome> {
        let start_url = parse_start_url(start_url)?;
        if workers == 0 {
            return Err(ScanError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }

        info!("Starting crawl of {} with {} workers", start_url, workers);

        let queue = Arc::new(WorkQueue::with_cancellation(self.cancel.clone()));
        let frontier = Arc::new(Frontier::new());
        let (result_tx, mut result_rx) = mpsc::unbounded_channel();
        let (dead_link_tx, mut dead_link_rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());

        frontier.try_claim(&start_url).await;
        queue.add(Job::new(start_url.clone())).await;

        let ctx = Arc::new(WorkerContext {
            start_url: start_url.clone(),
            queue: queue.clone(),
            frontier,
            fetcher: self.fetcher.clone(),
            extractor: self.extractor.clone(),
            results: result_tx,
            dead_links: dead_link_tx,
            counters: counters.clone(),
            max_attempts: self.max_attempts,
            retry_backoff: self.retry_backoff,
            cancel: self.cancel.clone(),
            progress_callback: self.progress_callback.clone(),
        });

        let handles: Vec<_> = (0..workers)
            .map(|worker_id| tokio::spawn(run_worker(worker_id, ctx.clone())))
            .collect();
        // Workers (and their page tasks) now hold the only senders.
        drop(ctx);

        let cancelled = tokio::select! {
            _ = queue.wait() => false,
            _ = self.cancel.cancelled() => true,
        };
        if cancelled {
            info!("Crawl of {} cancelled", start_url);
        }

        for handle in futures::future::join_all(handles).await {
            if let Err(e) = handle {
                warn!("Worker task failed: {}", ScanError::from(e));
            }
        }

        let mut site_map = SiteMap::new();
        while let Some(page) = result_rx.recv().await {
            let url = page.url.clone();
            if !site_map.insert(page) {
                warn!("Discarding duplicate result for {}", url);
            }
        }

        let mut dead_links = Vec::new();
        while let Some(link) = dead_link_rx.recv().await {
            dead_links.push(link);
        }

        info!("Crawl complete. Mapped {} pages", site_map.len());

        Ok(CrawlOutcome {
            start_url,
            site_map,
            dead_links,
            stats: counters.snapshot(),
            cancelled,
        })
    }
}

/// Parse and canonicalize a crawl seed; it must be absolute http(s) with a host.
pub fn parse_start_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ScanError::InvalidUrl(format!("'{}': {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ScanError::InvalidUrl(format!(
            "'{}': scheme must be http or https",
            raw
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ScanError::InvalidUrl(format!("'{}': missing host", raw)));
    }
    Ok(normalize(url))
}

fn backoff_delay(base: Duration, attempts: u32) -> Duration {
    base.saturating_mul(1u32 << attempts.min(16))
        .min(MAX_RETRY_BACKOFF)
}

#[derive(Default)]
struct Counters {
    pages_crawled: AtomicUsize,
    fetch_failures: AtomicUsize,
    retries: AtomicUsize,
    abandoned: AtomicUsize,
    parse_failures: AtomicUsize,
}

impl Counters {
    fn snapshot(&self) -> CrawlStats {
        CrawlStats {
            pages_crawled: self.pages_crawled.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
        }
    }
}

/// State shared by every worker of one crawl.
struct WorkerContext {
    start_url: Url,
    queue: Arc<WorkQueue>,
    frontier: Arc<Frontier>,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    results: mpsc::UnboundedSender<PageResult>,
    dead_links: mpsc::UnboundedSender<Url>,
    counters: Arc<Counters>,
    max_attempts: u32,
    retry_backoff: Duration,
    cancel: CancellationToken,
    progress_callback: Option<ProgressCallback>,
}

/// How a leased message should be acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Processed,
    Abandoned,
    Failed,
}

async fn run_worker(worker_id: usize, ctx: Arc<WorkerContext>) {
    debug!("Worker {} started", worker_id);

    while let Some(message) = ctx.queue.next().await {
        // Each page runs in its own task so a panic, including one raised by
        // the progress callback, comes back as a JoinError and the lease is
        // still returned.
        let mut page_task = tokio::spawn(process_page(
            ctx.clone(),
            worker_id,
            message.job.clone(),
            message.attempts,
        ));

        let joined = tokio::select! {
            joined = &mut page_task => Some(joined),
            _ = ctx.cancel.cancelled() => None,
        };
        let Some(joined) = joined else {
            page_task.abort();
            break;
        };

        let disposition = joined.unwrap_or_else(|e| {
            warn!(
                "Worker {} lost {} to a failed page task: {}",
                worker_id, message.job.url, e
            );
            Disposition::Failed
        });

        let acked = match disposition {
            Disposition::Processed | Disposition::Abandoned => ctx.queue.delete(message).await,
            Disposition::Failed => retry_or_abandon(&ctx, message).await,
        };
        if let Err(e) = acked {
            warn!("Worker {} could not acknowledge message: {}", worker_id, e);
        }
    }

    debug!("Worker {} finished", worker_id);
}

async fn process_page(
    ctx: Arc<WorkerContext>,
    worker_id: usize,
    job: Job,
    attempts: u32,
) -> Disposition {
    let url = job.url;
    debug!("Worker {} crawling {}", worker_id, url);

    if let Some(ref callback) = ctx.progress_callback {
        callback(worker_id, url.to_string());
    }

    let body = match ctx.fetcher.fetch(&url).await {
        Ok(body) => body,
        Err(e) => {
            warn!("Error fetching {}: {}", url, e);
            return Disposition::Failed;
        }
    };

    let links = match ctx.extractor.extract(&url, &body) {
        Ok(links) => links,
        Err(e) => {
            warn!("Error parsing {}: {}", url, e);
            ctx.counters.parse_failures.fetch_add(1, Ordering::Relaxed);
            return Disposition::Abandoned;
        }
    };

    for link in &links.external_links {
        // The receiver outlives every worker, so a send can only fail after
        // the crawl has been torn down.
        let _ = ctx.dead_links.send(link.clone());
    }

    let mut page = PageResult::new(url);
    page.attempts = attempts;

    for link in links.internal_links {
        let canonical = match canonicalize(&ctx.start_url, link.as_str()) {
            Ok(canonical) => canonical,
            Err(e) => {
                warn!("Skipping link {}: {}", link, e);
                continue;
            }
        };

        if ctx.frontier.try_claim(&canonical).await {
            debug!("Queuing {}", canonical);
            ctx.queue.add(Job::new(canonical.clone())).await;
        }
        page.internal_links.push(canonical);
    }

    page.external_links = links.external_links;
    page.assets = links.assets;

    ctx.counters.pages_crawled.fetch_add(1, Ordering::Relaxed);
    let _ = ctx.results.send(page);

    Disposition::Processed
}

/// Send a failed message back for another attempt, or drop it once the
/// attempt ceiling is reached. The message stays leased during the backoff.
async fn retry_or_abandon(ctx: &WorkerContext, message: Message) -> Result<()> {
    ctx.counters.fetch_failures.fetch_add(1, Ordering::Relaxed);

    let attempts_made = message.attempts + 1;
    if attempts_made >= ctx.max_attempts {
        warn!(
            "Giving up on {} after {} attempt(s)",
            message.job.url, attempts_made
        );
        ctx.counters.abandoned.fetch_add(1, Ordering::Relaxed);
        return ctx.queue.delete(message).await;
    }

    let delay = backoff_delay(ctx.retry_backoff, message.attempts);
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = ctx.cancel.cancelled() => return Ok(()),
    }

    ctx.counters.retries.fetch_add(1, Ordering::Relaxed);
    ctx.queue.error(message).await
}
