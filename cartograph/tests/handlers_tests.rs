use cartograph::commands::command_argument_builder;
use cartograph::handlers::*;
use cartograph_core::report::{ReportFormat, generate_markdown_report, generate_text_report};
use cartograph_scanner::{CrawlOutcome, CrawlStats, PageResult, SiteMap};
use std::path::PathBuf;
use wiremock::matchers::{method, path};
use url::Url;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_parse_url_line_with_scheme() {
    let result = parse_url_line("https://example.com");
    assert_eq!(result, Some("https://example.com".to_string()));
}

#[test]
fn test_parse_url_line_without_scheme() {
    let result = parse_url_line("example.com");
    assert_eq!(result, Some("http://example.com".to_string()));
}

#[test]
fn test_parse_url_line_trims_whitespace() {
    let result = parse_url_line("  localhost:4039/index.html \n");
    assert_eq!(result, Some("http://localhost:4039/index.html".to_string()));
}

#[test]
fn test_parse_url_line_invalid() {
    assert_eq!(parse_url_line("not a valid url!!!"), None);
    assert_eq!(parse_url_line("   "), None);
}

#[test]
fn test_resolve_start_url_canonicalizes() {
    let url = resolve_start_url("example.com/docs/?page=2#intro").unwrap();
    assert_eq!(url.as_str(), "http://example.com/docs/");
}

#[test]
fn test_resolve_start_url_rejects_other_schemes() {
    assert!(resolve_start_url("ftp://example.com/").is_err());
    assert!(resolve_start_url("").is_err());
}

#[test]
fn test_resolve_output_path_expands_tilde() {
    let path = resolve_output_path("~/sitemap.json");
    assert!(!path.to_string_lossy().starts_with('~'));
    assert!(path.ends_with("sitemap.json"));

    assert_eq!(
        resolve_output_path("out/sitemap.json"),
        PathBuf::from("out/sitemap.json")
    );
}

// ============================================================================
// Command Line Tests
// ============================================================================

#[test]
fn test_crawl_command_defaults() {
    let matches = command_argument_builder()
        .try_get_matches_from(["cartograph", "crawl", "--url", "http://x/"])
        .unwrap();
    assert!(!matches.get_flag("quiet"));

    let crawl = matches.subcommand_matches("crawl").unwrap();
    assert_eq!(crawl.get_one::<usize>("threads"), Some(&10));
    assert_eq!(crawl.get_one::<u64>("timeout"), Some(&10));
    assert_eq!(crawl.get_one::<u32>("max-attempts"), Some(&3));
    assert!(crawl.get_one::<String>("output").is_none());

    let options = report_options_from_args(crawl).unwrap();
    assert_eq!(options.format, ReportFormat::Json);
    assert!(options.pretty);
    assert!(!options.include_dead_links);
}

#[test]
fn test_crawl_command_report_flags() {
    let matches = command_argument_builder()
        .try_get_matches_from([
            "cartograph",
            "-q",
            "crawl",
            "-u",
            "http://x/",
            "-t",
            "4",
            "-f",
            "markdown",
            "--no-indent",
            "--dead-links",
        ])
        .unwrap();
    assert!(matches.get_flag("quiet"));

    let crawl = matches.subcommand_matches("crawl").unwrap();
    assert_eq!(crawl.get_one::<usize>("threads"), Some(&4));

    let options = report_options_from_args(crawl).unwrap();
    assert_eq!(options.format, ReportFormat::Markdown);
    assert!(!options.pretty);
    assert!(options.include_dead_links);
}

#[test]
fn test_crawl_command_requires_url() {
    let result = command_argument_builder().try_get_matches_from(["cartograph", "crawl"]);
    assert!(result.is_err());
}

#[test]
fn test_crawl_command_rejects_bad_values() {
    assert!(
        command_argument_builder()
            .try_get_matches_from(["cartograph", "crawl", "-u", "http://x/", "-f", "csv"])
            .is_err()
    );
    assert!(
        command_argument_builder()
            .try_get_matches_from(["cartograph", "crawl", "-u", "http://x/", "-t", "many"])
            .is_err()
    );
    assert!(
        command_argument_builder()
            .try_get_matches_from(["cartograph", "crawl", "-u", "http://x/", "--max-attempts", "0"])
            .is_err()
    );
}

// ============================================================================
// Crawl Handler Tests
// ============================================================================

#[tokio::test]
async fn test_handle_crawl_rejects_zero_threads() {
    let matches = command_argument_builder()
        .try_get_matches_from(["cartograph", "-q", "crawl", "-u", "http://x/", "-t", "0"])
        .unwrap();
    let crawl = matches.subcommand_matches("crawl").unwrap();

    let code = handle_crawl(crawl, true).await.unwrap();
    assert_eq!(code, EXIT_USAGE);
}

#[tokio::test]
async fn test_handle_crawl_rejects_unsupported_scheme() {
    let matches = command_argument_builder()
        .try_get_matches_from(["cartograph", "-q", "crawl", "-u", "ftp://x/"])
        .unwrap();
    let crawl = matches.subcommand_matches("crawl").unwrap();

    let code = handle_crawl(crawl, true).await.unwrap();
    assert_eq!(code, EXIT_USAGE);
}

#[tokio::test]
async fn test_handle_crawl_writes_site_map() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <a href="/about.html">About</a>
                <a href="https://elsewhere.example/">Elsewhere</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about.html"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"<a href="/">Home</a>"#),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let output = dir.path().join("sitemap.json");
    let output_arg = output.to_string_lossy().to_string();
    let uri = server.uri();

    let matches = command_argument_builder().try_get_matches_from([
        "cartograph",
        "-q",
        "crawl",
        "-u",
        uri.as_str(),
        "-t",
        "2",
        "-o",
        output_arg.as_str(),
        "--dead-links",
    ])?;
    let crawl = matches.subcommand_matches("crawl").unwrap();

    let code = handle_crawl(crawl, true).await?;
    assert_eq!(code, EXIT_OK);

    let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output)?)?;
    let pages = report["pages"].as_object().unwrap();
    assert_eq!(pages.len(), 2);

    let root = &pages[&format!("{}/", uri)];
    assert_eq!(
        root["internal_links"],
        serde_json::json!([format!("{}/about.html", uri)])
    );
    assert_eq!(
        root["external_links"],
        serde_json::json!(["https://elsewhere.example/"])
    );
    assert!(pages.contains_key(&format!("{}/about.html", uri)));
    assert_eq!(
        report["dead_links"],
        serde_json::json!(["https://elsewhere.example/"])
    );

    Ok(())
}

// ============================================================================
// Summary Tests
// ============================================================================

/// Two pages that both link to the same external site.
fn shared_external_outcome() -> CrawlOutcome {
    let other = Url::parse("https://other.com/").unwrap();
    let mut site_map = SiteMap::new();
    for page in ["http://x/", "http://x/about.html"] {
        let mut result = PageResult::new(Url::parse(page).unwrap());
        result.external_links.push(other.clone());
        site_map.insert(result);
    }

    CrawlOutcome {
        start_url: Url::parse("http://x/").unwrap(),
        site_map,
        dead_links: vec![other.clone(), other],
        stats: CrawlStats::default(),
        cancelled: false,
    }
}

#[test]
fn test_summary_counts_match_reports() {
    let outcome = shared_external_outcome();
    let summary = crawl_summary(&outcome);

    assert!(summary.contains("Pages mapped:   2"));
    assert!(summary.contains("External links: 2"));
    assert!(generate_text_report(&outcome, false).contains("External links: 2"));
    assert!(generate_markdown_report(&outcome, false).contains("| 2 | 0 | 2 | 0 |"));
}

#[test]
fn test_summary_reports_lost_pages() {
    let mut outcome = shared_external_outcome();
    outcome.stats.abandoned = 1;
    assert!(crawl_summary(&outcome).contains("1 pages could not be fetched, 0 could not be parsed"));

    outcome.stats.abandoned = 0;
    assert!(!crawl_summary(&outcome).contains("could not be fetched"));
}
