use crate::confluence::{
    get_page_data, get_space_data, list_pages_data, list_spaces_data, search_data,
    ListPagesParams, ListSpacesParams, SearchParams,
};
use crate::prelude::{eprintln, *};
use crate::transport::Transport;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{CallToolResult, Content, JsonRpcError};

const DEFAULT_LIMIT: usize = 25;

fn parse_arguments<T: DeserializeOwned>(
    arguments: Option<serde_json::Value>,
) -> Result<T, JsonRpcError> {
    let arguments = match arguments {
        None | Some(serde_json::Value::Null) => serde_json::json!({}),
        Some(value) => value,
    };
    serde_json::from_value(arguments)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid arguments: {e}")))
}

fn to_call_result(result: CallToolResult) -> Result<serde_json::Value, JsonRpcError> {
    serde_json::to_value(result).map_err(|e| JsonRpcError::internal(format!("Internal error: {e}")))
}

/// Human readable message for a failed tool call
///
/// The prefix tells the agent whether the operator must fix credentials, the
/// request itself was rejected, or the call may simply be retried.
pub fn describe_failure(report: &Report) -> String {
    let classified = report
        .chain()
        .find_map(|cause| cause.downcast_ref::<TransportError>());

    match classified {
        Some(err) if err.is_auth() => format!("Authentication error: {err}"),
        Some(err) if err.status().is_some() => match err {
            TransportError::NotFound { body } if !body.trim().is_empty() => {
                format!("Confluence API error: {err} ({})", body.trim())
            }
            _ => format!("Confluence API error: {err}"),
        },
        Some(err) if err.is_transient() => format!("Transient error (safe to retry): {err}"),
        Some(err) => format!("Request aborted: {err}"),
        None => format!("Tool execution error: {report}"),
    }
}

/// Wrap a data function outcome into an MCP tool result
fn tool_result<T: Serialize>(outcome: Result<T>) -> Result<serde_json::Value, JsonRpcError> {
    let result = match outcome {
        Ok(data) => {
            let json_string = serde_json::to_string_pretty(&data)
                .map_err(|e| JsonRpcError::internal(format!("Serialization error: {e}")))?;
            CallToolResult {
                content: vec![Content::Text { text: json_string }],
                is_error: None,
            }
        }
        Err(report) => {
            log::warn!("Tool call failed: {report:?}");
            CallToolResult {
                content: vec![Content::Text {
                    text: describe_failure(&report),
                }],
                is_error: Some(true),
            }
        }
    };

    to_call_result(result)
}

fn transport(global: &crate::Global) -> Result<Transport, JsonRpcError> {
    Transport::from_global(global)
        .map_err(|e| JsonRpcError::internal(format!("Failed to create HTTP client: {e}")))
}

#[derive(Debug, Deserialize)]
struct ListSpacesArgs {
    #[serde(rename = "type")]
    space_type: Option<String>,
    status: Option<String>,
    #[serde(default)]
    keys: Vec<String>,
    limit: Option<usize>,
    cursor: Option<String>,
}

/// Handle conf_ls_spaces via MCP
pub async fn handle_ls_spaces(
    arguments: Option<serde_json::Value>,
    global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    let args: ListSpacesArgs = parse_arguments(arguments)?;

    if global.verbose {
        eprintln!(
            "Calling conf_ls_spaces: keys={:?}, limit={:?}, cursor={:?}",
            args.keys, args.limit, args.cursor
        );
    }

    let transport = transport(global)?;
    let params = ListSpacesParams {
        space_type: args.space_type,
        status: args.status,
        keys: args.keys,
        limit: args.limit.unwrap_or(DEFAULT_LIMIT),
        cursor: args.cursor,
    };

    tool_result(list_spaces_data(&transport, params).await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetSpaceArgs {
    space_key: String,
}

/// Handle conf_get_space via MCP
pub async fn handle_get_space(
    arguments: Option<serde_json::Value>,
    global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    let args: GetSpaceArgs = parse_arguments(arguments)?;

    if args.space_key.trim().is_empty() {
        return Err(JsonRpcError::invalid_params("'spaceKey' cannot be empty"));
    }

    if global.verbose {
        eprintln!("Calling conf_get_space: spaceKey={}", args.space_key);
    }

    let transport = transport(global)?;
    tool_result(get_space_data(&transport, args.space_key).await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPagesArgs {
    #[serde(default)]
    space_ids: Vec<String>,
    title: Option<String>,
    status: Option<String>,
    sort: Option<String>,
    limit: Option<usize>,
    cursor: Option<String>,
}

/// Handle conf_ls_pages via MCP
pub async fn handle_ls_pages(
    arguments: Option<serde_json::Value>,
    global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    let args: ListPagesArgs = parse_arguments(arguments)?;

    if global.verbose {
        eprintln!(
            "Calling conf_ls_pages: spaceIds={:?}, title={:?}, limit={:?}, cursor={:?}",
            args.space_ids, args.title, args.limit, args.cursor
        );
    }

    let transport = transport(global)?;
    let params = ListPagesParams {
        space_ids: args.space_ids,
        title: args.title,
        status: args.status,
        sort: args.sort,
        limit: args.limit.unwrap_or(DEFAULT_LIMIT),
        cursor: args.cursor,
    };

    tool_result(list_pages_data(&transport, params).await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetPageArgs {
    page_id: String,
}

/// Handle conf_get_page via MCP
pub async fn handle_get_page(
    arguments: Option<serde_json::Value>,
    global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    let args: GetPageArgs = parse_arguments(arguments)?;

    let page_id = args.page_id.trim();
    if page_id.is_empty() || !page_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(JsonRpcError::invalid_params(format!(
            "'pageId' must be a numeric ID, got {:?}",
            args.page_id
        )));
    }

    if global.verbose {
        eprintln!("Calling conf_get_page: pageId={page_id}");
    }

    let transport = transport(global)?;
    tool_result(get_page_data(&transport, page_id.to_string()).await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArgs {
    cql: Option<String>,
    space_key: Option<String>,
    limit: Option<usize>,
    cursor: Option<String>,
}

/// Handle conf_search via MCP
pub async fn handle_search(
    arguments: Option<serde_json::Value>,
    global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    let args: SearchArgs = parse_arguments(arguments)?;

    let has_cql = args.cql.as_deref().is_some_and(|q| !q.trim().is_empty());
    let has_space = args
        .space_key
        .as_deref()
        .is_some_and(|k| !k.trim().is_empty());
    if !has_cql && !has_space {
        return Err(JsonRpcError::invalid_params(
            "Must provide 'cql', 'spaceKey', or both",
        ));
    }

    if global.verbose {
        eprintln!(
            "Calling conf_search: cql={:?}, spaceKey={:?}, limit={:?}, cursor={:?}",
            args.cql, args.space_key, args.limit, args.cursor
        );
    }

    let transport = transport(global)?;
    let params = SearchParams {
        cql: args.cql.unwrap_or_default(),
        space_key: args.space_key,
        limit: args.limit.unwrap_or(DEFAULT_LIMIT),
        cursor: args.cursor,
    };

    tool_result(search_data(&transport, params).await)
}
