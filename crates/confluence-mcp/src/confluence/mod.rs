use crate::prelude::{eprintln, println, *};
use colored::Colorize;
use confluence_mcp_core::pagination::PaginationResult;
use indicatif::{ProgressBar, ProgressStyle};

pub mod pages;
pub mod search;
pub mod spaces;

pub use pages::{get_page_data, list_pages_data, ListPagesParams};
pub use search::{search_data, SearchParams};
pub use spaces::{get_space_data, list_spaces_data, ListSpacesParams};

/// Confluence v2 caps page size at 250
pub const MAX_LIMIT: usize = 250;

/// Upper bound for a single API exchange
pub const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Confluence commands
#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// List spaces visible to the configured account
    #[clap(name = "ls-spaces")]
    ListSpaces(spaces::ListOptions),

    /// Show a single space by key
    #[clap(name = "get-space")]
    GetSpace(spaces::GetOptions),

    /// List pages, optionally within specific spaces
    #[clap(name = "ls-pages")]
    ListPages(pages::ListOptions),

    /// Show a page and its content as Markdown
    #[clap(name = "get-page")]
    GetPage(pages::GetOptions),

    /// Search Confluence using CQL or free text
    #[clap(name = "search")]
    Search(search::SearchOptions),
}

/// Run Confluence commands
pub async fn run(cmd: Commands, global: crate::Global) -> Result<()> {
    if global.verbose {
        eprintln!("Running Confluence command...");
    }

    match cmd {
        Commands::ListSpaces(options) => spaces::list_handler(options, global).await,
        Commands::GetSpace(options) => spaces::get_handler(options, global).await,
        Commands::ListPages(options) => pages::list_handler(options, global).await,
        Commands::GetPage(options) => pages::get_handler(options, global).await,
        Commands::Search(options) => search::handler(options, global).await,
    }
}

/// Spinner shown while a request is in flight
pub(crate) fn spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.into());
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}

/// Print the follow-up command when more results exist
///
/// `args` are the subcommand and every option of the current invocation.
pub(crate) fn print_next_page_hint(pagination: &PaginationResult, args: &[String]) {
    if let Some(cursor) = pagination.next_cursor() {
        eprintln!();
        eprintln!(
            "{}",
            "More results available. To fetch the next page, run:".cyan()
        );
        eprintln!("  {}", next_page_command(args, cursor));
    }
}

/// Shell command that repeats `args` starting from `cursor`
pub(crate) fn next_page_command(args: &[String], cursor: &str) -> String {
    let mut command = String::from("confluence-mcp confluence");
    for arg in args.iter().map(String::as_str).chain(["--cursor", cursor]) {
        command.push(' ');
        command.push_str(&shell_quote(arg));
    }
    command
}

fn shell_quote(arg: &str) -> String {
    // try_quote only rejects NUL bytes
    let cleaned = arg.replace('\0', "");
    match shlex::try_quote(&cleaned) {
        Ok(quoted) => quoted.into_owned(),
        Err(_) => cleaned,
    }
}

/// Append `flag value` when the value is present
pub(crate) fn push_opt(args: &mut Vec<String>, flag: &str, value: Option<&str>) {
    if let Some(value) = value {
        args.push(flag.to_string());
        args.push(value.to_string());
    }
}

/// Render an optional field for table output
pub(crate) fn or_na(value: Option<&str>) -> String {
    value.unwrap_or("N/A").to_string()
}

/// Print any serializable output as pretty JSON
pub(crate) fn print_json<T: serde::Serialize>(data: &T) -> Result<()> {
    let json_output =
        serde_json::to_string_pretty(data).map_err(|e| eyre!("Failed to serialize output: {}", e))?;
    println!("{}", json_output);
    Ok(())
}
