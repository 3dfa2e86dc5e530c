use super::{
    or_na, print_json, print_next_page_hint, push_opt, spinner, MAX_LIMIT, REQUEST_TIMEOUT,
};
use crate::prelude::{println, *};
use crate::transport::Transport;
use colored::Colorize;
use serde::{Deserialize, Serialize};

use confluence_mcp_core::atlassian::confluence::{
    transform_search_results, ConfluenceSearchResponse, SearchOutput,
};
use confluence_mcp_core::cql::{normalize_query, scope_to_space};
use confluence_mcp_core::pagination::{extract_pagination, PaginationScheme};
use confluence_mcp_core::request::RequestOptions;

const SEARCH_PATH: &str = "/wiki/rest/api/search";

/// Options for searching Confluence
#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
pub struct SearchOptions {
    /// CQL expression or free text (e.g., 'type=page AND space=DEV' or 'release notes')
    #[clap(default_value = "")]
    pub query: String,

    /// Restrict results to a space key
    #[arg(long)]
    pub space: Option<String>,

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

impl SearchOptions {
    /// Subcommand, query and filters that reproduce this search
    fn command_args(&self) -> Vec<String> {
        let mut args = vec!["search".to_string()];
        if !self.query.is_empty() {
            args.push(self.query.clone());
        }
        push_opt(&mut args, "--space", self.space.as_deref());
        push_opt(&mut args, "--limit", Some(self.limit.to_string().as_str()));
        args
    }
}

/// Parameters for a search
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub cql: String,
    pub space_key: Option<String>,
    pub limit: usize,
    pub cursor: Option<String>,
}

/// Build the CQL that is sent: normalized, then scoped to a space when one is given
pub fn effective_cql(cql: &str, space_key: Option<&str>) -> Result<String> {
    let normalized = normalize_query(cql);
    let space_key = space_key.map(str::trim).filter(|k| !k.is_empty());

    match space_key {
        Some(key) => Ok(scope_to_space(&normalized, key)),
        None if normalized.trim().is_empty() => {
            Err(eyre!("A search query or a space key is required"))
        }
        None => Ok(normalized),
    }
}

/// Public data function - used by both CLI and MCP
/// Runs a CQL search with cursor pagination
pub async fn search_data(transport: &Transport, params: SearchParams) -> Result<SearchOutput> {
    let cql = effective_cql(&params.cql, params.space_key.as_deref())?;
    log::debug!("Effective CQL: {cql}");

    let credentials = transport.credentials()?;
    let options = RequestOptions::get()
        .timeout(REQUEST_TIMEOUT)
        .query("cql", &cql)
        .query("limit", params.limit.clamp(1, MAX_LIMIT))
        .query_opt("cursor", params.cursor);

    let raw = transport.request(&credentials, SEARCH_PATH, options).await?;
    let pagination = extract_pagination(PaginationScheme::Cursor, &raw);
    let response: ConfluenceSearchResponse = serde_json::from_value(raw)
        .map_err(TransportError::from)
        .wrap_err("Failed to parse Confluence search response")?;

    Ok(transform_search_results(response, cql, pagination))
}

/// Handle the search command
pub async fn handler(options: SearchOptions, global: crate::Global) -> Result<()> {
    let transport = Transport::from_global(&global)?;
    let params = SearchParams {
        cql: options.query.clone(),
        space_key: options.space.clone(),
        limit: options.limit,
        cursor: options.cursor.clone(),
    };

    let spinner = spinner("Searching Confluence...");
    let data = search_data(&transport, params).await;
    spinner.finish_and_clear();
    let data = data?;

    if options.json {
        return print_json(&data);
    }

    println!("\nCQL: {}", data.cql.bright_white());
    match data.total {
        Some(total) => println!(
            "Showing {} of {} result(s):\n",
            data.results.len().to_string().bold(),
            total.to_string().bold()
        ),
        None => println!(
            "Found {} result(s):\n",
            data.results.len().to_string().bold()
        ),
    }

    if data.results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    let mut table = crate::prelude::new_table();
    table.add_row(prettytable::row![
        "ID".bold().cyan(),
        "Title".bold().cyan(),
        "Type".bold().cyan(),
        "Space".bold().cyan(),
        "URL".bold().cyan()
    ]);

    for hit in &data.results {
        table.add_row(prettytable::row![
            or_na(hit.id.as_deref()).bright_yellow(),
            hit.title.bright_white(),
            or_na(hit.content_type.as_deref()),
            or_na(hit.space.as_deref()),
            or_na(hit.url.as_deref())
        ]);
    }

    table.printstd();

    print_next_page_hint(&data.pagination, &options.command_args());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_cql_passes_structured_query_through() {
        let cql = effective_cql("type=page AND space=DEV", None).unwrap();
        assert_eq!(cql, "type=page AND space=DEV");
    }

    #[test]
    fn test_effective_cql_converts_free_text() {
        let cql = effective_cql("release notes", None).unwrap();
        assert_eq!(cql, r#"text~"release" AND text~"notes""#);
    }

    #[test]
    fn test_effective_cql_scopes_to_space() {
        let cql = effective_cql("type=page", Some("DEV")).unwrap();
        assert_eq!(cql, r#"space="DEV" AND (type=page)"#);
    }

    #[test]
    fn test_effective_cql_space_only() {
        let cql = effective_cql("", Some(" DEV ")).unwrap();
        assert_eq!(cql, r#"space="DEV""#);
    }

    #[test]
    fn test_command_args_keep_query_verbatim() {
        let options = SearchOptions {
            query: r#"type=page AND text~"it's done""#.to_string(),
            space: Some("DEV".to_string()),
            limit: 5,
            cursor: None,
            json: false,
        };

        assert_eq!(
            options.command_args(),
            vec![
                "search",
                r#"type=page AND text~"it's done""#,
                "--space",
                "DEV",
                "--limit",
                "5",
            ]
        );
    }

    #[test]
    fn test_command_args_space_only_search() {
        let options = SearchOptions {
            query: String::new(),
            space: Some("OPS".to_string()),
            limit: 25,
            cursor: None,
            json: false,
        };

        assert_eq!(
            options.command_args(),
            vec!["search", "--space", "OPS", "--limit", "25"]
        );
    }

    #[test]
    fn test_effective_cql_requires_query_or_space() {
        assert!(effective_cql("   ", None).is_err());
        assert!(effective_cql("", Some("  ")).is_err());
    }
}
