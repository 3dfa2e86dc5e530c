use super::{
    or_na, print_json, print_next_page_hint, push_opt, spinner, MAX_LIMIT, REQUEST_TIMEOUT,
};
use crate::prelude::{println, *};
use crate::transport::Transport;
use colored::Colorize;
use serde::{Deserialize, Serialize};

use confluence_mcp_core::atlassian::confluence::{
    transform_page_response, transform_pages_response, PageListOutput, PageOutput, PageResponse,
    PagesResponse,
};
use confluence_mcp_core::pagination::{extract_pagination, PaginationScheme};
use confluence_mcp_core::request::RequestOptions;

const PAGES_PATH: &str = "/wiki/api/v2/pages";

/// Options for listing pages
#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
pub struct ListOptions {
    /// Only include pages from these space IDs (can be repeated)
    #[arg(long = "space-id")]
    pub space_ids: Vec<String>,

    /// Filter by exact page title
    #[arg(long)]
    pub title: Option<String>,

    /// Filter by page status (current, archived, draft, trashed)
    #[arg(long)]
    pub status: Option<String>,

    /// Sort order (e.g., "-modified-date", "title")
    #[arg(long)]
    pub sort: Option<String>,

    /// Maximum number of results to return per page
    #[arg(short, long, default_value = "25")]
    pub limit: usize,

    /// Cursor from a previous response
    #[arg(long)]
    pub cursor: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ListOptions {
    /// Subcommand and filters that reproduce this listing
    fn command_args(&self) -> Vec<String> {
        let mut args = vec!["ls-pages".to_string()];
        for space_id in &self.space_ids {
            push_opt(&mut args, "--space-id", Some(space_id.as_str()));
        }
        push_opt(&mut args, "--title", self.title.as_deref());
        push_opt(&mut args, "--status", self.status.as_deref());
        push_opt(&mut args, "--sort", self.sort.as_deref());
        push_opt(&mut args, "--limit", Some(self.limit.to_string().as_str()));
        args
    }
}

/// Options for fetching a single page
#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
pub struct GetOptions {
    /// Numeric page ID
    pub page_id: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Parameters for listing pages
#[derive(Debug, Clone, Default)]
pub struct ListPagesParams {
    pub space_ids: Vec<String>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub sort: Option<String>,
    pub limit: usize,
    pub cursor: Option<String>,
}

/// Public data function - used by both CLI and MCP
/// Lists pages with cursor pagination
pub async fn list_pages_data(
    transport: &Transport,
    params: ListPagesParams,
) -> Result<PageListOutput> {
    let credentials = transport.credentials()?;

    let space_ids = (!params.space_ids.is_empty()).then(|| params.space_ids.join(","));
    let options = RequestOptions::get()
        .timeout(REQUEST_TIMEOUT)
        .query("limit", params.limit.clamp(1, MAX_LIMIT))
        .query_opt("space-id", space_ids)
        .query_opt("title", params.title)
        .query_opt("status", params.status)
        .query_opt("sort", params.sort)
        .query_opt("cursor", params.cursor);

    let raw = transport.request(&credentials, PAGES_PATH, options).await?;
    let pagination = extract_pagination(PaginationScheme::Cursor, &raw);
    let response: PagesResponse = serde_json::from_value(raw)
        .map_err(TransportError::from)
        .wrap_err("Failed to parse Confluence pages response")?;

    Ok(transform_pages_response(response, pagination))
}

/// Public data function - used by both CLI and MCP
/// Fetches one page with its body rendered to Markdown
pub async fn get_page_data(transport: &Transport, page_id: String) -> Result<PageOutput> {
    let page_id = page_id.trim();
    if page_id.is_empty() || !page_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(eyre!("Invalid page ID {:?}: expected a numeric ID", page_id));
    }

    let credentials = transport.credentials()?;
    let options = RequestOptions::get()
        .timeout(REQUEST_TIMEOUT)
        .query("body-format", "view");

    let raw = transport
        .request(&credentials, &format!("{PAGES_PATH}/{page_id}"), options)
        .await?;
    let page: PageResponse = serde_json::from_value(raw)
        .map_err(TransportError::from)
        .wrap_err("Failed to parse Confluence page response")?;

    let wiki_base = Transport::wiki_base(&credentials);
    Ok(transform_page_response(page, Some(&wiki_base)))
}

/// Handle the ls-pages command
pub async fn list_handler(options: ListOptions, global: crate::Global) -> Result<()> {
    let transport = Transport::from_global(&global)?;
    let params = ListPagesParams {
        space_ids: options.space_ids.clone(),
        title: options.title.clone(),
        status: options.status.clone(),
        sort: options.sort.clone(),
        limit: options.limit,
        cursor: options.cursor.clone(),
    };

    let spinner = spinner("Fetching pages...");
    let data = list_pages_data(&transport, params).await;
    spinner.finish_and_clear();
    let data = data?;

    if options.json {
        return print_json(&data);
    }

    println!("\nFound {} page(s):\n", data.pages.len().to_string().bold());

    if data.pages.is_empty() {
        println!("No pages found.");
        return Ok(());
    }

    let mut table = crate::prelude::new_table();
    table.add_row(prettytable::row![
        "ID".bold().cyan(),
        "Title".bold().cyan(),
        "Space".bold().cyan(),
        "Version".bold().cyan(),
        "URL".bold().cyan()
    ]);

    for page in &data.pages {
        let version = page
            .version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        table.add_row(prettytable::row![
            page.id.bright_yellow(),
            page.title.bright_white(),
            or_na(page.space_id.as_deref()),
            version,
            or_na(page.url.as_deref())
        ]);
    }

    table.printstd();

    print_next_page_hint(&data.pagination, &options.command_args());

    Ok(())
}

/// Handle the get-page command
pub async fn get_handler(options: GetOptions, global: crate::Global) -> Result<()> {
    let transport = Transport::from_global(&global)?;

    let spinner = spinner(format!("Fetching page {}...", options.page_id));
    let page = get_page_data(&transport, options.page_id).await;
    spinner.finish_and_clear();
    let page = page?;

    if options.json {
        return print_json(&page);
    }

    println!("# {}\n", page.title.bold());
    println!("ID:      {}", page.id);
    println!("Space:   {}", or_na(page.space_id.as_deref()));
    println!(
        "Version: {}",
        page.version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "N/A".to_string())
    );
    println!("Updated: {}", or_na(page.updated_at.as_deref()));
    println!("URL:     {}", or_na(page.url.as_deref()));
    println!();
    println!(
        "{}",
        page.content.as_deref().unwrap_or("(This page has no content.)")
    );

    Ok(())
}
