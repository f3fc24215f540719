pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    crawl_summary, handle_crawl, init_logging, parse_url_line, report_options_from_args,
    resolve_output_path, resolve_start_url,
};

// Re-export crawl functionality from cartograph-core
pub use cartograph_core::crawl::{CrawlOptions, execute_crawl, extract_url_path};
