// Site map report generation

use crate::crawl::extract_url_path;
use cartograph_scanner::{CrawlOutcome, PageResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Unknown report format: {0}")]
    UnknownFormat(String),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Json,
    Text,
    Markdown,
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "text" | "txt" => Ok(ReportFormat::Text),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            other => Err(ReportError::UnknownFormat(other.to_string())),
        }
    }
}

/// How a crawl outcome should be rendered.
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub format: ReportFormat,
    /// Indented JSON. Ignored by the other formats.
    pub pretty: bool,
    pub include_dead_links: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            format: ReportFormat::Json,
            pretty: true,
            include_dead_links: false,
        }
    }
}

/// Link references summed over every mapped page. A URL linked from two
/// pages counts twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkTotals {
    pub internal: usize,
    pub external: usize,
    pub assets: usize,
}

pub fn link_totals(outcome: &CrawlOutcome) -> LinkTotals {
    outcome
        .site_map
        .pages()
        .fold(LinkTotals::default(), |mut totals, page| {
            totals.internal += page.internal_links.len();
            totals.external += page.external_links.len();
            totals.assets += page.assets.len();
            totals
        })
}

pub fn render_report(outcome: &CrawlOutcome, options: &ReportOptions) -> Result<String, ReportError> {
    match options.format {
        ReportFormat::Json => Ok(generate_json_report(
            outcome,
            options.pretty,
            options.include_dead_links,
        )?),
        ReportFormat::Text => Ok(generate_text_report(outcome, options.include_dead_links)),
        ReportFormat::Markdown => Ok(generate_markdown_report(
            outcome,
            options.include_dead_links,
        )),
    }
}

/// `{"pages": {url: {internal_links, external_links, assets}}}`, keys sorted.
pub fn generate_json_report(
    outcome: &CrawlOutcome,
    pretty: bool,
    include_dead_links: bool,
) -> Result<String, serde_json::Error> {
    let mut document = serde_json::to_value(&outcome.site_map)?;
    if include_dead_links {
        document["dead_links"] = serde_json::json!(outcome.unique_dead_links());
    }

    if pretty {
        serde_json::to_string_pretty(&document)
    } else {
        serde_json::to_string(&document)
    }
}

pub fn generate_text_report(outcome: &CrawlOutcome, include_dead_links: bool) -> String {
    let mut report = String::new();
    let totals = link_totals(outcome);

    report.push_str(RULE);
    report.push('\n');
    report.push_str("                           CARTOGRAPH SITE MAP\n");
    report.push_str(RULE);
    report.push_str("\n\n");

    report.push_str(&format!("Start URL:      {}\n", outcome.start_url));
    report.push_str(&format!("Generated:      {}\n", generated_at()));
    report.push_str(&format!("Status:         {}\n", status(outcome)));
    report.push_str(&format!("Pages mapped:   {}\n", outcome.site_map.len()));
    report.push_str(&format!("Internal links: {}\n", totals.internal));
    report.push_str(&format!("External links: {}\n", totals.external));
    report.push_str(&format!("Assets:         {}\n", totals.assets));
    if outcome.stats.retries > 0 || outcome.stats.abandoned > 0 {
        report.push_str(&format!(
            "Retries:        {} ({} pages abandoned)\n",
            outcome.stats.retries, outcome.stats.abandoned
        ));
    }
    report.push('\n');

    report.push_str(RULE);
    report.push_str("\nPAGES\n");
    report.push_str(RULE);
    report.push_str("\n\n");

    for page in outcome.site_map.pages() {
        report.push_str(&format!("{}\n", extract_url_path(page.url.as_str())));
        for link in &page.internal_links {
            report.push_str(&format!("  → {}\n", display_link(&outcome.start_url, link)));
        }
        for link in &page.external_links {
            report.push_str(&format!("  ↗ {}\n", link));
        }
        for asset in &page.assets {
            report.push_str(&format!("  · {}\n", display_link(&outcome.start_url, asset)));
        }
        report.push('\n');
    }

    if include_dead_links {
        let dead_links = outcome.unique_dead_links();
        report.push_str(RULE);
        report.push_str(&format!("\nEXTERNAL LINKS ({})\n", dead_links.len()));
        report.push_str(RULE);
        report.push_str("\n\n");
        for link in dead_links {
            report.push_str(&format!("  {}\n", link));
        }
        report.push('\n');
    }

    report
}

pub fn generate_markdown_report(outcome: &CrawlOutcome, include_dead_links: bool) -> String {
    let mut report = String::new();
    let totals = link_totals(outcome);

    report.push_str(&format!("# Site map for {}\n\n", outcome.start_url));
    report.push_str(&format!("_Generated {}. {}._\n\n", generated_at(), status(outcome)));

    report.push_str("| Pages | Internal links | External links | Assets |\n");
    report.push_str("|------:|---------------:|---------------:|-------:|\n");
    report.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        outcome.site_map.len(),
        totals.internal,
        totals.external,
        totals.assets
    ));

    for page in outcome.site_map.pages() {
        report.push_str(&format!("## `{}`\n\n", extract_url_path(page.url.as_str())));
        if page_is_empty(page) {
            report.push_str("No outgoing links.\n\n");
            continue;
        }
        push_markdown_list(&mut report, "Internal links", &page.internal_links);
        push_markdown_list(&mut report, "External links", &page.external_links);
        push_markdown_list(&mut report, "Assets", &page.assets);
    }

    if include_dead_links {
        let dead_links = outcome.unique_dead_links();
        report.push_str(&format!("## External links ({})\n\n", dead_links.len()));
        for link in dead_links {
            report.push_str(&format!("- <{}>\n", link));
        }
        report.push('\n');
    }

    report
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn push_markdown_list(report: &mut String, title: &str, links: &[Url]) {
    if links.is_empty() {
        return;
    }
    report.push_str(&format!("**{}**\n\n", title));
    for link in links {
        report.push_str(&format!("- <{}>\n", link));
    }
    report.push('\n');
}

fn page_is_empty(page: &PageResult) -> bool {
    page.internal_links.is_empty() && page.external_links.is_empty() && page.assets.is_empty()
}

/// Same-origin links print as a path, anything else in full.
fn display_link(start_url: &Url, link: &Url) -> String {
    if link.origin() == start_url.origin() {
        extract_url_path(link.as_str())
    } else {
        link.to_string()
    }
}

fn status(outcome: &CrawlOutcome) -> &'static str {
    if outcome.cancelled {
        "Cancelled (partial map)"
    } else {
        "Completed"
    }
}

fn generated_at() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
