use super::{
    or_na, print_json, print_next_page_hint, push_opt, spinner, MAX_LIMIT, REQUEST_TIMEOUT,
};
use crate::prelude::{println, *};
use crate::transport::Transport;
use colored::Colorize;
use serde::{Deserialize, Serialize};

use confluence_mcp_core::atlassian::confluence::{
    transform_space_lookup, transform_spaces_response, SpaceListOutput, SpaceOutput,
    SpacesResponse,
};
use confluence_mcp_core::pagination::{extract_pagination, PaginationScheme};
use confluence_mcp_core::request::RequestOptions;

const SPACES_PATH: &str = "/wiki/api/v2/spaces";

/// Options for listing spaces
#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
pub struct ListOptions {
    /// Filter by space type (global, personal)
    #[arg(long = "type")]
    pub space_type: Option<String>,

    /// Filter by space status (current, archived)
    #[arg(long)]
    pub status: Option<String>,

    /// Only include these space keys (can be repeated)
    #[arg(long = "key")]
    pub keys: Vec<String>,

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
        let mut args = vec!["ls-spaces".to_string()];
        push_opt(&mut args, "--type", self.space_type.as_deref());
        push_opt(&mut args, "--status", self.status.as_deref());
        for key in &self.keys {
            push_opt(&mut args, "--key", Some(key.as_str()));
        }
        push_opt(&mut args, "--limit", Some(self.limit.to_string().as_str()));
        args
    }
}

/// Options for fetching a single space
#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
pub struct GetOptions {
    /// Space key (e.g., "DEV")
    pub key: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Parameters for listing spaces
#[derive(Debug, Clone, Default)]
pub struct ListSpacesParams {
    pub space_type: Option<String>,
    pub status: Option<String>,
    pub keys: Vec<String>,
    pub limit: usize,
    pub cursor: Option<String>,
}

/// Public data function - used by both CLI and MCP
/// Lists spaces with cursor pagination
pub async fn list_spaces_data(
    transport: &Transport,
    params: ListSpacesParams,
) -> Result<SpaceListOutput> {
    let credentials = transport.credentials()?;

    let keys = (!params.keys.is_empty()).then(|| params.keys.join(","));
    let options = RequestOptions::get()
        .timeout(REQUEST_TIMEOUT)
        .query("limit", params.limit.clamp(1, MAX_LIMIT))
        .query_opt("type", params.space_type)
        .query_opt("status", params.status)
        .query_opt("keys", keys)
        .query_opt("cursor", params.cursor);

    let raw = transport.request(&credentials, SPACES_PATH, options).await?;
    let pagination = extract_pagination(PaginationScheme::Cursor, &raw);
    let response: SpacesResponse = serde_json::from_value(raw)
        .map_err(TransportError::from)
        .wrap_err("Failed to parse Confluence spaces response")?;

    Ok(transform_spaces_response(response, pagination))
}

/// Public data function - used by both CLI and MCP
/// Looks a space up by key; an unknown key is a NotFound error
pub async fn get_space_data(transport: &Transport, key: String) -> Result<SpaceOutput> {
    let key = key.trim().to_string();
    if key.is_empty() {
        return Err(eyre!("Space key cannot be empty"));
    }

    let credentials = transport.credentials()?;
    let options = RequestOptions::get()
        .timeout(REQUEST_TIMEOUT)
        .query("keys", &key)
        .query("limit", 1);

    let raw = transport.request(&credentials, SPACES_PATH, options).await?;
    let response: SpacesResponse = serde_json::from_value(raw)
        .map_err(TransportError::from)
        .wrap_err("Failed to parse Confluence spaces response")?;

    transform_space_lookup(response).ok_or_else(|| {
        Report::new(TransportError::NotFound {
            body: format!("No space with key {key}"),
        })
    })
}

/// Handle the ls-spaces command
pub async fn list_handler(options: ListOptions, global: crate::Global) -> Result<()> {
    let transport = Transport::from_global(&global)?;
    let params = ListSpacesParams {
        space_type: options.space_type.clone(),
        status: options.status.clone(),
        keys: options.keys.clone(),
        limit: options.limit,
        cursor: options.cursor.clone(),
    };

    let spinner = spinner("Fetching spaces...");
    let data = list_spaces_data(&transport, params).await;
    spinner.finish_and_clear();
    let data = data?;

    if options.json {
        return print_json(&data);
    }

    println!("\nFound {} space(s):\n", data.spaces.len().to_string().bold());

    if data.spaces.is_empty() {
        println!("No spaces found.");
        return Ok(());
    }

    let mut table = crate::prelude::new_table();
    table.add_row(prettytable::row![
        "Key".bold().cyan(),
        "Name".bold().cyan(),
        "Type".bold().cyan(),
        "Status".bold().cyan(),
        "URL".bold().cyan()
    ]);

    for space in &data.spaces {
        table.add_row(prettytable::row![
            space.key.bright_yellow(),
            space.name.bright_white(),
            or_na(space.space_type.as_deref()),
            or_na(space.status.as_deref()),
            or_na(space.url.as_deref())
        ]);
    }

    table.printstd();

    print_next_page_hint(&data.pagination, &options.command_args());

    Ok(())
}

/// Handle the get-space command
pub async fn get_handler(options: GetOptions, global: crate::Global) -> Result<()> {
    let transport = Transport::from_global(&global)?;
    let space = get_space_data(&transport, options.key).await?;

    if options.json {
        return print_json(&space);
    }

    println!("{} {}", space.key.bright_yellow().bold(), space.name.bold());
    println!("  ID:       {}", space.id);
    println!("  Type:     {}", or_na(space.space_type.as_deref()));
    println!("  Status:   {}", or_na(space.status.as_deref()));
    println!("  Homepage: {}", or_na(space.homepage_id.as_deref()));
    println!("  URL:      {}", or_na(space.url.as_deref()));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_args_keep_every_filter() {
        let options = ListOptions {
            space_type: Some("global".to_string()),
            status: Some("archived".to_string()),
            keys: vec!["DEV".to_string(), "OPS".to_string()],
            limit: 10,
            cursor: None,
            json: false,
        };

        assert_eq!(
            options.command_args(),
            vec![
                "ls-spaces",
                "--type",
                "global",
                "--status",
                "archived",
                "--key",
                "DEV",
                "--key",
                "OPS",
                "--limit",
                "10",
            ]
        );
    }

    #[test]
    fn test_command_args_without_filters() {
        let options = ListOptions {
            space_type: None,
            status: None,
            keys: Vec::new(),
            limit: 25,
            cursor: Some("abc".to_string()),
            json: true,
        };

        assert_eq!(options.command_args(), vec!["ls-spaces", "--limit", "25"]);
    }
}
