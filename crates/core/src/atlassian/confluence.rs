//! Pure transformation functions for Confluence API responses
//!
//! This module contains zero I/O operations and is fully testable with fixture data.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::pagination::PaginationResult;

// ============================================================================
// Domain Models (Input from API)
// ============================================================================

/// Links block shared by most Confluence objects
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Links {
    #[serde(default)]
    pub webui: Option<String>,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
}

/// Space from `GET /wiki/api/v2/spaces`
#[derive(Debug, Deserialize, Clone)]
pub struct SpaceResponse {
    pub id: String,
    pub key: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub space_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "homepageId", default)]
    pub homepage_id: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
    #[serde(rename = "_links", default)]
    pub links: Links,
}

/// Paginated list of spaces
#[derive(Debug, Deserialize, Clone)]
pub struct SpacesResponse {
    #[serde(default)]
    pub results: Vec<SpaceResponse>,
    #[serde(rename = "_links", default)]
    pub links: Links,
}

/// Page version information
#[derive(Debug, Deserialize, Clone)]
pub struct PageVersion {
    pub number: u64,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
}

/// Body content from page
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PageBody {
    #[serde(default)]
    pub view: Option<BodyRepresentation>,
    #[serde(default)]
    pub storage: Option<BodyRepresentation>,
}

/// One representation of a page body (HTML for `view`)
#[derive(Debug, Deserialize, Clone)]
pub struct BodyRepresentation {
    #[serde(default)]
    pub value: Option<String>,
}

/// Page from `GET /wiki/api/v2/pages` or `GET /wiki/api/v2/pages/{id}`
#[derive(Debug, Deserialize, Clone)]
pub struct PageResponse {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "spaceId", default)]
    pub space_id: Option<String>,
    #[serde(rename = "parentId", default)]
    pub parent_id: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub version: Option<PageVersion>,
    #[serde(default)]
    pub body: Option<PageBody>,
    #[serde(rename = "_links", default)]
    pub links: Links,
}

/// Paginated list of pages
#[derive(Debug, Deserialize, Clone)]
pub struct PagesResponse {
    #[serde(default)]
    pub results: Vec<PageResponse>,
    #[serde(rename = "_links", default)]
    pub links: Links,
}

/// Content reference inside a search hit
#[derive(Debug, Deserialize, Clone)]
pub struct SearchContent {
    pub id: String,
    #[serde(rename = "type", default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "_links", default)]
    pub links: Links,
}

/// Container (space) of a search hit
#[derive(Debug, Deserialize, Clone)]
pub struct SearchContainer {
    #[serde(default)]
    pub title: Option<String>,
}

/// One hit from `GET /wiki/rest/api/search`
#[derive(Debug, Deserialize, Clone)]
pub struct SearchResultResponse {
    #[serde(default)]
    pub content: Option<SearchContent>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "resultGlobalContainer", default)]
    pub container: Option<SearchContainer>,
    #[serde(rename = "lastModified", default)]
    pub last_modified: Option<String>,
}

/// Search response from Confluence API
#[derive(Debug, Deserialize, Clone)]
pub struct ConfluenceSearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResultResponse>,
    #[serde(default, rename = "totalSize")]
    pub total_size: Option<u64>,
    #[serde(rename = "_links", default)]
    pub links: Links,
}

// ============================================================================
// Output Models (Domain Model)
// ============================================================================

/// Output structure for a single space
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SpaceOutput {
    pub id: String,
    pub key: String,
    pub name: String,
    pub space_type: Option<String>,
    pub status: Option<String>,
    pub homepage_id: Option<String>,
    pub url: Option<String>,
}

/// Output structure for the space list
#[derive(Debug, Serialize, PartialEq)]
pub struct SpaceListOutput {
    pub spaces: Vec<SpaceOutput>,
    pub pagination: PaginationResult,
}

/// Output structure for a page in a listing
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PageSummary {
    pub id: String,
    pub title: String,
    pub status: Option<String>,
    pub space_id: Option<String>,
    pub parent_id: Option<String>,
    pub version: Option<u64>,
    pub created_at: Option<String>,
    pub url: Option<String>,
}

/// Output structure for the page list
#[derive(Debug, Serialize, PartialEq)]
pub struct PageListOutput {
    pub pages: Vec<PageSummary>,
    pub pagination: PaginationResult,
}

/// Output structure for a single page with its content as Markdown
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PageOutput {
    pub id: String,
    pub title: String,
    pub status: Option<String>,
    pub space_id: Option<String>,
    pub version: Option<u64>,
    pub updated_at: Option<String>,
    pub url: Option<String>,
    pub content: Option<String>,
}

/// Output structure for a single search hit
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SearchResultOutput {
    pub id: Option<String>,
    pub title: String,
    pub content_type: Option<String>,
    pub space: Option<String>,
    pub excerpt: Option<String>,
    pub url: Option<String>,
    pub last_modified: Option<String>,
}

/// Output structure for search command
#[derive(Debug, Serialize, PartialEq)]
pub struct SearchOutput {
    /// CQL actually sent to Confluence
    pub cql: String,
    pub results: Vec<SearchResultOutput>,
    pub total: Option<u64>,
    pub pagination: PaginationResult,
}

// ============================================================================
// Pure Helper Functions
// ============================================================================

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag regex is valid"))
}

/// Convert HTML content to plain text (simple conversion)
///
/// Removes tags, decodes entities and drops search highlight markers.
pub fn html_to_plaintext(html: &str) -> String {
    let text = html
        .replace("@@@hl@@@", "")
        .replace("@@@endhl@@@", "")
        .replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("<br />", "\n")
        .replace("</p>", "\n")
        .replace("</div>", "\n");

    let cleaned = tag_regex().replace_all(&text, "");
    let decoded = html_escape::decode_html_entities(&cleaned);

    decoded
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convert a rendered (`view`) page body to Markdown
pub fn html_to_markdown(html: &str) -> String {
    html2md::parse_html(html).trim().to_string()
}

/// Join a site-relative `webui` link with the response's `_links.base`
pub fn absolute_url(base: Option<&str>, webui: Option<&str>) -> Option<String> {
    let webui = webui?;
    if webui.starts_with("http://") || webui.starts_with("https://") {
        return Some(webui.to_string());
    }
    match base {
        Some(base) => Some(format!("{}{}", base.trim_end_matches('/'), webui)),
        None => Some(webui.to_string()),
    }
}

// ============================================================================
// Pure Transformation Functions
// ============================================================================

fn transform_space(space: SpaceResponse, base: Option<&str>) -> SpaceOutput {
    let url = absolute_url(base, space.links.webui.as_deref());
    SpaceOutput {
        id: space.id,
        key: space.key,
        name: space.name,
        space_type: space.space_type,
        status: space.status,
        homepage_id: space.homepage_id,
        url,
    }
}

/// Pure transformation: spaces response to the space list output
pub fn transform_spaces_response(
    response: SpacesResponse,
    pagination: PaginationResult,
) -> SpaceListOutput {
    let base = response.links.base.as_deref();
    let spaces = response
        .results
        .into_iter()
        .map(|space| transform_space(space, base))
        .collect();

    SpaceListOutput { spaces, pagination }
}

/// Pure transformation: first space of a `keys=` lookup, if any
pub fn transform_space_lookup(response: SpacesResponse) -> Option<SpaceOutput> {
    let base = response.links.base.clone();
    response
        .results
        .into_iter()
        .next()
        .map(|space| transform_space(space, base.as_deref()))
}

/// Pure transformation: pages response to the page list output
pub fn transform_pages_response(
    response: PagesResponse,
    pagination: PaginationResult,
) -> PageListOutput {
    let base = response.links.base.as_deref();
    let pages = response
        .results
        .into_iter()
        .map(|page| PageSummary {
            url: absolute_url(base, page.links.webui.as_deref()),
            id: page.id,
            title: page.title,
            status: page.status,
            space_id: page.space_id,
            parent_id: page.parent_id,
            version: page.version.map(|v| v.number),
            created_at: page.created_at,
        })
        .collect();

    PageListOutput { pages, pagination }
}

/// Pure transformation: single page to the page output with Markdown content
///
/// Single-page responses carry no `_links.base`, so the caller passes the site
/// wiki base (e.g. `https://acme.atlassian.net/wiki`).
pub fn transform_page_response(page: PageResponse, wiki_base: Option<&str>) -> PageOutput {
    let content = page
        .body
        .as_ref()
        .and_then(|body| body.view.as_ref().or(body.storage.as_ref()))
        .and_then(|repr| repr.value.as_deref())
        .map(html_to_markdown);
    let (version, updated_at) = match page.version {
        Some(v) => (Some(v.number), v.created_at),
        None => (None, None),
    };

    PageOutput {
        url: absolute_url(wiki_base, page.links.webui.as_deref()),
        id: page.id,
        title: page.title,
        status: page.status,
        space_id: page.space_id,
        version,
        updated_at,
        content,
    }
}

/// Pure transformation: Convert Confluence search response to domain model
///
/// # Arguments
/// * `search_response` - The raw response from the Confluence search API
/// * `cql` - The CQL that produced it
/// * `pagination` - Cursor extracted from the raw response
pub fn transform_search_results(
    search_response: ConfluenceSearchResponse,
    cql: String,
    pagination: PaginationResult,
) -> SearchOutput {
    let base = search_response.links.base.as_deref();
    let results = search_response
        .results
        .into_iter()
        .map(|hit| {
            let content = hit.content.as_ref();
            let title = hit
                .title
                .as_deref()
                .or_else(|| content.and_then(|c| c.title.as_deref()))
                .map(html_to_plaintext)
                .unwrap_or_default();
            let webui = content
                .and_then(|c| c.links.webui.as_deref())
                .or(hit.url.as_deref());

            SearchResultOutput {
                id: content.map(|c| c.id.clone()),
                title,
                content_type: content.and_then(|c| c.content_type.clone()),
                space: hit.container.as_ref().and_then(|c| c.title.clone()),
                excerpt: hit
                    .excerpt
                    .as_deref()
                    .map(html_to_plaintext)
                    .filter(|e| !e.is_empty()),
                url: absolute_url(base, webui),
                last_modified: hit.last_modified.clone(),
            }
        })
        .collect();

    SearchOutput {
        cql,
        results,
        total: search_response.total_size,
        pagination,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_html_to_plaintext_basic() {
        let html = "<p>Hello <strong>World</strong></p>";
        assert_eq!(html_to_plaintext(html), "Hello World");
    }

    #[test]
    fn test_html_to_plaintext_with_breaks() {
        let html = "Line 1<br>Line 2<br/>Line 3<br />Line 4";
        assert_eq!(html_to_plaintext(html), "Line 1\nLine 2\nLine 3\nLine 4");
    }

    #[test]
    fn test_html_to_plaintext_with_entities_and_highlights() {
        let html = "&lt;div&gt; &amp; @@@hl@@@quotes@@@endhl@@@";
        assert_eq!(html_to_plaintext(html), "<div> & quotes");
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(
            absolute_url(Some("https://acme.atlassian.net/wiki/"), Some("/spaces/DEV")),
            Some("https://acme.atlassian.net/wiki/spaces/DEV".to_string())
        );
        assert_eq!(
            absolute_url(None, Some("/spaces/DEV")),
            Some("/spaces/DEV".to_string())
        );
        assert_eq!(absolute_url(Some("https://x"), None), None);
    }

    #[test]
    fn test_transform_spaces_response() {
        // Arrange: a v2 spaces response as returned by Confluence Cloud
        let raw = json!({
            "results": [
                {
                    "id": "98306",
                    "key": "DEV",
                    "name": "Development",
                    "type": "global",
                    "status": "current",
                    "homepageId": "98307",
                    "_links": {"webui": "/spaces/DEV"}
                },
                {"id": "98310", "key": "~jdoe", "name": "Jane Doe", "type": "personal"}
            ],
            "_links": {
                "base": "https://acme.atlassian.net/wiki",
                "next": "/wiki/api/v2/spaces?cursor=abc"
            }
        });
        let response: SpacesResponse = serde_json::from_value(raw).unwrap();

        // Act
        let output =
            transform_spaces_response(response, PaginationResult::new(Some("abc".to_string())));

        // Assert
        assert_eq!(output.spaces.len(), 2);
        assert_eq!(output.spaces[0].key, "DEV");
        assert_eq!(
            output.spaces[0].url.as_deref(),
            Some("https://acme.atlassian.net/wiki/spaces/DEV")
        );
        assert_eq!(output.spaces[1].space_type.as_deref(), Some("personal"));
        assert_eq!(output.spaces[1].url, None);
        assert_eq!(output.pagination.next_cursor(), Some("abc"));
    }

    #[test]
    fn test_transform_space_lookup_empty() {
        let response: SpacesResponse = serde_json::from_value(json!({"results": []})).unwrap();
        assert_eq!(transform_space_lookup(response), None);
    }

    #[test]
    fn test_transform_pages_response() {
        let raw = json!({
            "results": [{
                "id": "123",
                "title": "Runbook",
                "status": "current",
                "spaceId": "98306",
                "parentId": "120",
                "createdAt": "2024-03-01T10:00:00.000Z",
                "version": {"number": 7, "createdAt": "2024-05-01T10:00:00.000Z"},
                "_links": {"webui": "/spaces/DEV/pages/123/Runbook"}
            }],
            "_links": {"base": "https://acme.atlassian.net/wiki"}
        });
        let response: PagesResponse = serde_json::from_value(raw).unwrap();

        let output = transform_pages_response(response, PaginationResult::done());

        assert_eq!(output.pages.len(), 1);
        let page = &output.pages[0];
        assert_eq!(page.id, "123");
        assert_eq!(page.version, Some(7));
        assert_eq!(page.parent_id.as_deref(), Some("120"));
        assert_eq!(
            page.url.as_deref(),
            Some("https://acme.atlassian.net/wiki/spaces/DEV/pages/123/Runbook")
        );
        assert!(!output.pagination.has_more());
    }

    #[test]
    fn test_transform_page_response_converts_body_to_markdown() {
        let raw = json!({
            "id": "123",
            "title": "Runbook",
            "status": "current",
            "spaceId": "98306",
            "version": {"number": 3, "createdAt": "2024-05-01T10:00:00.000Z"},
            "body": {"view": {"representation": "view", "value": "<h1>Deploy</h1><p>Run <strong>make</strong></p>"}},
            "_links": {"webui": "/spaces/DEV/pages/123/Runbook"}
        });
        let page: PageResponse = serde_json::from_value(raw).unwrap();

        let output = transform_page_response(page, Some("https://acme.atlassian.net/wiki"));

        let content = output.content.unwrap();
        assert!(content.contains("Deploy"));
        assert!(content.contains("**make**"));
        assert!(!content.contains("<p>"));
        assert_eq!(output.version, Some(3));
        assert_eq!(output.updated_at.as_deref(), Some("2024-05-01T10:00:00.000Z"));
        assert_eq!(
            output.url.as_deref(),
            Some("https://acme.atlassian.net/wiki/spaces/DEV/pages/123/Runbook")
        );
    }

    #[test]
    fn test_transform_page_response_without_body() {
        let page: PageResponse =
            serde_json::from_value(json!({"id": "9", "title": "Empty"})).unwrap();

        let output = transform_page_response(page, None);

        assert_eq!(output.content, None);
        assert_eq!(output.url, None);
        assert_eq!(output.version, None);
    }

    #[test]
    fn test_transform_search_results() {
        // Arrange: a v1 search response with one page hit and one space hit
        let raw = json!({
            "results": [
                {
                    "content": {
                        "id": "123",
                        "type": "page",
                        "title": "Runbook",
                        "_links": {"webui": "/spaces/DEV/pages/123/Runbook"}
                    },
                    "title": "@@@hl@@@Runbook@@@endhl@@@",
                    "excerpt": "How to @@@hl@@@deploy@@@endhl@@@ &amp; roll back",
                    "resultGlobalContainer": {"title": "Development"},
                    "lastModified": "2024-05-01T10:00:00.000Z"
                },
                {
                    "title": "Operations",
                    "excerpt": "",
                    "url": "/spaces/OPS"
                }
            ],
            "totalSize": 2,
            "_links": {"base": "https://acme.atlassian.net/wiki"}
        });
        let response: ConfluenceSearchResponse = serde_json::from_value(raw).unwrap();

        // Act
        let output = transform_search_results(
            response,
            r#"text~"deploy""#.to_string(),
            PaginationResult::done(),
        );

        // Assert
        assert_eq!(output.cql, r#"text~"deploy""#);
        assert_eq!(output.total, Some(2));
        assert_eq!(output.results.len(), 2);

        let first = &output.results[0];
        assert_eq!(first.id.as_deref(), Some("123"));
        assert_eq!(first.title, "Runbook");
        assert_eq!(first.content_type.as_deref(), Some("page"));
        assert_eq!(first.space.as_deref(), Some("Development"));
        assert_eq!(first.excerpt.as_deref(), Some("How to deploy & roll back"));
        assert_eq!(
            first.url.as_deref(),
            Some("https://acme.atlassian.net/wiki/spaces/DEV/pages/123/Runbook")
        );

        let second = &output.results[1];
        assert_eq!(second.id, None);
        assert_eq!(second.excerpt, None);
        assert_eq!(
            second.url.as_deref(),
            Some("https://acme.atlassian.net/wiki/spaces/OPS")
        );
    }

    #[test]
    fn test_transform_search_results_empty() {
        let response: ConfluenceSearchResponse =
            serde_json::from_value(json!({"results": [], "totalSize": 0})).unwrap();

        let output =
            transform_search_results(response, "type=page".to_string(), PaginationResult::done());

        assert!(output.results.is_empty());
        assert_eq!(output.total, Some(0));
    }
}
