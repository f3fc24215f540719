use cartograph::commands::command_argument_builder;
use cartograph::handlers::handle_crawl;
use cartograph_core::print_banner;
use colored::Colorize;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    let result = match chosen_command.subcommand() {
        Some(("crawl", primary_command)) => handle_crawl(primary_command, quiet).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "✗ Crawl failed:".red().bold(), e);
            1
        }
    };
    std::process::exit(code);
}
