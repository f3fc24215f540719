use anyhow::{Context, Result, anyhow};
use cartograph_core::crawl::{CrawlOptions, execute_crawl};
use cartograph_core::report::{ReportFormat, ReportOptions, link_totals, render_report, save_report};
use cartograph_scanner::{CancellationToken, CrawlOutcome, parse_start_url};
use clap::ArgMatches;
use colored::Colorize;
use std::path::PathBuf;
use tracing::{Level, warn};
use url::Url;

/// Exit code for a crawl that finished and was written out.
pub const EXIT_OK: i32 = 0;
/// Exit code for bad command-line input, reported before any work starts.
pub const EXIT_USAGE: i32 = 2;

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    // Try to parse as-is
    if let Ok(url) = Url::parse(line)
        && url.has_host()
    {
        return Some(line.to_string());
    }

    // Try adding http://
    let with_scheme = format!("http://{}", line);
    if Url::parse(&with_scheme).is_ok() {
        return Some(with_scheme);
    }

    None
}

/// Validate the start URL argument, returning its canonical form.
pub fn resolve_start_url(raw: &str) -> Result<Url, String> {
    let candidate =
        parse_url_line(raw).ok_or_else(|| format!("Could not validate url '{}'", raw))?;
    parse_start_url(&candidate).map_err(|e| e.to_string())
}

/// Expand `~` in a user-supplied output path.
pub fn resolve_output_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

pub fn report_options_from_args(args: &ArgMatches) -> Result<ReportOptions> {
    let format = args
        .get_one::<String>("format")
        .map(|f| f.parse::<ReportFormat>())
        .transpose()?
        .unwrap_or(ReportFormat::Json);

    Ok(ReportOptions {
        format,
        pretty: !args.get_flag("no-indent"),
        include_dead_links: args.get_flag("dead-links"),
    })
}

/// Install the stderr log subscriber. Safe to call more than once.
pub fn init_logging(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn usage_error(message: &str) -> i32 {
    eprintln!("{} {}", "✗ Error:".red().bold(), message);
    eprintln!("Usage: cartograph crawl --url <URL> [OPTIONS]");
    EXIT_USAGE
}

/// Stop the crawl when the user hits Ctrl-C.
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping crawl");
            token.cancel();
        }
    });
}

pub async fn handle_crawl(args: &ArgMatches, quiet: bool) -> Result<i32> {
    init_logging(args.get_flag("debug"));

    let raw_url = args
        .get_one::<String>("url")
        .ok_or_else(|| anyhow!("--url is required"))?;
    let start_url = match resolve_start_url(raw_url) {
        Ok(url) => url,
        Err(message) => return Ok(usage_error(&message)),
    };

    let threads = args.get_one::<usize>("threads").copied().unwrap_or(10);
    if threads == 0 {
        return Ok(usage_error("--threads must be at least 1"));
    }

    let report_options = report_options_from_args(args)?;
    let options = CrawlOptions {
        threads,
        timeout_secs: args.get_one::<u64>("timeout").copied().unwrap_or(10),
        max_attempts: args.get_one::<u32>("max-attempts").copied().unwrap_or(3),
        show_progress_bars: !quiet,
        ..CrawlOptions::new(start_url.as_str())
    };

    if !quiet {
        eprintln!(
            "{} Crawling {} with {} workers",
            "→".blue().bold(),
            start_url.as_str().bright_white(),
            threads
        );
    }

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    let outcome = execute_crawl(options, cancel)
        .await
        .with_context(|| format!("Crawl of {} failed", start_url))?;

    let report = render_report(&outcome, &report_options)?;

    match args.get_one::<String>("output") {
        Some(raw_path) => {
            let path = resolve_output_path(raw_path);
            save_report(&report, &path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !quiet {
                eprintln!(
                    "{} Site map written to {}",
                    "✓".green().bold(),
                    path.display().to_string().bright_white()
                );
            }
        }
        None => println!("{}", report.trim_end()),
    }

    if !quiet {
        print_summary(&outcome);
    }

    Ok(EXIT_OK)
}

fn print_summary(outcome: &CrawlOutcome) {
    eprintln!();
    eprint!("{}", crawl_summary(outcome));
}

/// The end-of-crawl summary shown on stderr. Counts match the text and
/// markdown report headers.
pub fn crawl_summary(outcome: &CrawlOutcome) -> String {
    let totals = link_totals(outcome);
    let status = if outcome.cancelled {
        "Crawl cancelled".yellow().bold()
    } else {
        "Crawl complete".green().bold()
    };

    let mut summary = format!("{}\n", status);
    summary.push_str(&format!("  Pages mapped:   {}\n", outcome.site_map.len()));
    summary.push_str(&format!("  Internal links: {}\n", totals.internal));
    summary.push_str(&format!("  External links: {}\n", totals.external));
    summary.push_str(&format!("  Assets:         {}\n", totals.assets));
    if outcome.stats.abandoned > 0 || outcome.stats.parse_failures > 0 {
        summary.push_str(&format!(
            "  {} {} pages could not be fetched, {} could not be parsed\n",
            "⚠".yellow(),
            outcome.stats.abandoned,
            outcome.stats.parse_failures
        ));
    }
    summary
}
