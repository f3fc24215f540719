use clap::{arg, command};

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("cartograph")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("cartograph")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            command!("crawl")
                .about(
                    "Map every page reachable from a start URL on the same host, recording \
                internal links, external links and assets per page.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The start URL (scheme defaults to http:// when omitted)"),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("The number of async workers in the worker pool.")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"max-attempts" <NUM>)
                        .required(false)
                        .help("Fetch attempts per page before it is abandoned")
                        .value_parser(clap::value_parser!(u32).range(1..))
                        .default_value("3"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: json, text, markdown")
                        .value_parser(["json", "text", "markdown"])
                        .default_value("json"),
                )
                .arg(
                    arg!(--"no-indent")
                        .required(false)
                        .help("Print the JSON site map without indentation")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"dead-links")
                        .required(false)
                        .help("Append the external links seen during the crawl to the report")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: print to stdout)"),
                )
                .arg(
                    arg!(--"debug")
                        .required(false)
                        .help("Enable debug logging")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}
