mod confluence;

use serde::{Deserialize, Serialize};

// Re-export types needed by tool handlers
pub use super::{JsonRpcError, Tool};

// MCP Protocol types for tools
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Serialize)]
pub struct ToolsCapability {}

#[derive(Debug, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
pub struct ToolsList {
    pub tools: Vec<Tool>,
}

#[derive(Debug, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    pub arguments: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum Content {
    #[serde(rename = "text")]
    Text { text: String },
}

const CREDENTIALS_NOTE: &str = "Requires ATLASSIAN_SITE_NAME, ATLASSIAN_USER_EMAIL and ATLASSIAN_API_TOKEN environment variables; ATLASSIAN_COOKIE optionally replaces basic auth.";

pub fn handle_initialize() -> Result<serde_json::Value, JsonRpcError> {
    let result = InitializeResult {
        protocol_version: "2024-11-05".to_string(),
        capabilities: ServerCapabilities {
            tools: Some(ToolsCapability {}),
        },
        server_info: ServerInfo {
            name: "confluence-mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    };

    serde_json::to_value(result).map_err(|e| JsonRpcError::internal(format!("Internal error: {e}")))
}

fn limit_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "number",
        "description": "Maximum number of results to return (default: 25, max: 250)"
    })
}

fn cursor_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "string",
        "description": "Opaque cursor from pagination.nextCursor of a previous response"
    })
}

pub fn tool_definitions() -> Vec<Tool> {
    vec![
        Tool {
            name: "conf_ls_spaces".to_string(),
            description: format!("List Confluence spaces visible to the configured account, with key, name, type, status and URL. Cursor paginated: pass pagination.nextCursor back as 'cursor' while pagination.hasMore is true. {CREDENTIALS_NOTE}"),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "type": {
                        "type": "string",
                        "description": "Filter by space type",
                        "enum": ["global", "personal"]
                    },
                    "status": {
                        "type": "string",
                        "description": "Filter by space status",
                        "enum": ["current", "archived"]
                    },
                    "keys": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Only include these space keys"
                    },
                    "limit": limit_schema(),
                    "cursor": cursor_schema()
                },
                "required": []
            }),
        },
        Tool {
            name: "conf_get_space".to_string(),
            description: format!("Get a single Confluence space by its key (e.g., 'DEV'). Returns the space ID needed by conf_ls_pages. {CREDENTIALS_NOTE}"),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "spaceKey": {
                        "type": "string",
                        "description": "Space key (e.g., 'DEV')"
                    }
                },
                "required": ["spaceKey"]
            }),
        },
        Tool {
            name: "conf_ls_pages".to_string(),
            description: format!("List Confluence pages, optionally filtered by space IDs, title and status. Cursor paginated like conf_ls_spaces. {CREDENTIALS_NOTE}"),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "spaceIds": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Numeric space IDs (see conf_get_space)"
                    },
                    "title": {
                        "type": "string",
                        "description": "Exact page title"
                    },
                    "status": {
                        "type": "string",
                        "description": "Page status",
                        "enum": ["current", "archived", "draft", "trashed"]
                    },
                    "sort": {
                        "type": "string",
                        "description": "Sort order (e.g., '-modified-date', 'title')"
                    },
                    "limit": limit_schema(),
                    "cursor": cursor_schema()
                },
                "required": []
            }),
        },
        Tool {
            name: "conf_get_page".to_string(),
            description: format!("Get a Confluence page by numeric ID with its body converted to Markdown. {CREDENTIALS_NOTE}"),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "pageId": {
                        "type": "string",
                        "description": "Numeric page ID"
                    }
                },
                "required": ["pageId"]
            }),
        },
        Tool {
            name: "conf_search".to_string(),
            description: format!("Search Confluence with CQL (Confluence Query Language) or plain free text. Free text such as 'release notes' is turned into text~ clauses, and reserved words used as values (e.g., space=IN) are quoted automatically. Returns titles, excerpts and URLs. Cursor paginated like conf_ls_spaces. {CREDENTIALS_NOTE}"),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "cql": {
                        "type": "string",
                        "description": "CQL query (e.g., 'type=page AND text~\"deploy\"') or free text"
                    },
                    "spaceKey": {
                        "type": "string",
                        "description": "Restrict results to this space key"
                    },
                    "limit": limit_schema(),
                    "cursor": cursor_schema()
                },
                "required": []
            }),
        },
    ]
}

pub fn handle_tools_list() -> Result<serde_json::Value, JsonRpcError> {
    let result = ToolsList {
        tools: tool_definitions(),
    };

    serde_json::to_value(result).map_err(|e| JsonRpcError::internal(format!("Internal error: {e}")))
}

pub async fn handle_tools_call(
    params: Option<serde_json::Value>,
    global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: CallToolParams = serde_json::from_value(params.unwrap_or(serde_json::Value::Null))
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {e}")))?;

    match params.name.as_str() {
        "conf_ls_spaces" => confluence::handle_ls_spaces(params.arguments, global).await,
        "conf_get_space" => confluence::handle_get_space(params.arguments, global).await,
        "conf_ls_pages" => confluence::handle_ls_pages(params.arguments, global).await,
        "conf_get_page" => confluence::handle_get_page(params.arguments, global).await,
        "conf_search" => confluence::handle_search(params.arguments, global).await,
        _ => Err(JsonRpcError::invalid_params(format!(
            "Unknown tool: {}",
            params.name
        ))),
    }
}
