pub mod canonical;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod frontier;
pub mod queue;
pub mod result;

pub use canonical::canonicalize;
pub use crawler::{Crawler, ProgressCallback, parse_start_url};
pub use error::ScanError;
pub use extract::{HtmlExtractor, LinkExtractor, PageLinks};
pub use fetch::{Fetcher, HttpFetcher};
pub use frontier::Frontier;
pub use queue::{Job, Message, MessageId, WorkQueue};
pub use result::{CrawlOutcome, CrawlStats, PageResult, SiteMap};
pub use tokio_util::sync::CancellationToken;
