pub mod crawl;
pub mod report;

use colored::Colorize;

pub fn print_banner() {
    let banner = r#"
                 _                              _
   ___ __ _ _ __| |_ ___   __ _ _ __ __ _ _ __ | |__
  / __/ _` | '__| __/ _ \ / _` | '__/ _` | '_ \| '_ \
 | (_| (_| | |  | || (_) | (_| | | | (_| | |_) | | | |
  \___\__,_|_|   \__\___/ \__, |_|  \__,_| .__/|_| |_|
                          |___/          |_|
"#;
    eprintln!("{}", banner.bright_cyan().bold());
    eprintln!(
        "  {} {}\n",
        "a concurrent single-site mapper".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
