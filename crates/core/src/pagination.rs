//! Pagination cursor extraction
//!
//! Atlassian products expose three incompatible "is there more" signals. This
//! module reduces each of them to one opaque cursor so callers can page without
//! knowing which backend answered. Extraction never fails: anything malformed
//! degrades to "no more pages" with a warning.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

/// Pagination convention used by a given endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationScheme {
    /// `startAt` / `maxResults` / `total` counters, or an explicit `nextPage`
    Offset,
    /// `_links.next` URL carrying a `cursor` query parameter
    Cursor,
    /// `next` URL carrying a `page` query parameter
    Page,
}

/// Next-page information handed back to tool callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationResult {
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    next_cursor: Option<String>,
    #[serde(rename = "hasMore")]
    has_more: bool,
}

impl PaginationResult {
    /// Build a result; `has_more` follows from the cursor
    pub fn new(next_cursor: Option<String>) -> Self {
        Self {
            has_more: next_cursor.is_some(),
            next_cursor,
        }
    }

    /// Last page
    pub fn done() -> Self {
        Self::new(None)
    }

    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }
}

/// Compute the next cursor for a raw API response
///
/// # Arguments
/// * `scheme` - Pagination convention of the endpoint that produced `response`
/// * `response` - Raw JSON response body
pub fn extract_pagination(scheme: PaginationScheme, response: &Value) -> PaginationResult {
    let cursor = match scheme {
        PaginationScheme::Offset => offset_cursor(response),
        PaginationScheme::Cursor => link_cursor(response),
        PaginationScheme::Page => page_cursor(response),
    };

    PaginationResult::new(cursor)
}

fn offset_cursor(response: &Value) -> Option<String> {
    let start_at = response.get("startAt").and_then(Value::as_u64);
    let max_results = response.get("maxResults").and_then(Value::as_u64);
    let total = response.get("total").and_then(Value::as_u64);

    if let (Some(start_at), Some(max_results), Some(total)) = (start_at, max_results, total) {
        let next = start_at.saturating_add(max_results);
        if next < total {
            return Some(next.to_string());
        }
    }

    response
        .get("nextPage")
        .and_then(Value::as_str)
        .filter(|next| !next.is_empty())
        .map(str::to_string)
}

fn cursor_param_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[?&]cursor=([^&#]+)").expect("cursor regex is valid"))
}

fn link_cursor(response: &Value) -> Option<String> {
    let next_link = response
        .get("_links")
        .and_then(|links| links.get("next"))
        .and_then(Value::as_str)?;

    let encoded = cursor_param_regex()
        .captures(next_link)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())?;

    match urlencoding::decode(encoded) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(e) => {
            log::warn!("Could not decode cursor from next link {next_link:?}: {e}");
            None
        }
    }
}

fn page_cursor(response: &Value) -> Option<String> {
    let next = response.get("next").and_then(Value::as_str)?;

    // Relative links resolve against a throwaway base; only the query matters.
    let base = url::Url::parse("http://localhost/").ok()?;
    let parsed = match base.join(next) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("Could not parse next page URL {next:?}: {e}");
            return None;
        }
    };

    let page = parsed
        .query_pairs()
        .find(|(key, _)| key == "page")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty());

    if page.is_none() {
        log::warn!("Next page URL {next:?} carries no page parameter");
    }
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_offset_more_pages() {
        let response = json!({"startAt": 0, "maxResults": 25, "total": 100});
        let result = extract_pagination(PaginationScheme::Offset, &response);

        assert_eq!(result.next_cursor(), Some("25"));
        assert!(result.has_more());
    }

    #[test]
    fn test_offset_last_page() {
        let response = json!({"startAt": 75, "maxResults": 25, "total": 100});
        let result = extract_pagination(PaginationScheme::Offset, &response);

        assert_eq!(result, PaginationResult::done());
        assert!(!result.has_more());
    }

    #[test]
    fn test_offset_falls_back_to_next_page() {
        let response = json!({"startAt": 0, "maxResults": 50, "nextPage": "token-123"});
        let result = extract_pagination(PaginationScheme::Offset, &response);

        assert_eq!(result.next_cursor(), Some("token-123"));
    }

    #[test]
    fn test_offset_counters_exhausted_but_next_page_present() {
        let response = json!({"startAt": 50, "maxResults": 50, "total": 100, "nextPage": "tok"});
        let result = extract_pagination(PaginationScheme::Offset, &response);

        assert_eq!(result.next_cursor(), Some("tok"));
    }

    #[test]
    fn test_offset_nothing_present() {
        let result = extract_pagination(PaginationScheme::Offset, &json!({"values": []}));
        assert!(!result.has_more());
    }

    #[test]
    fn test_cursor_decodes_parameter() {
        let response = json!({
            "results": [],
            "_links": {"next": "/wiki/api/v2/spaces?limit=25&cursor=abc%3D"}
        });
        let result = extract_pagination(PaginationScheme::Cursor, &response);

        assert_eq!(result.next_cursor(), Some("abc="));
        assert!(result.has_more());
    }

    #[test]
    fn test_cursor_first_parameter() {
        let response = json!({"_links": {"next": "/wiki/rest/api/search?cursor=xyz&limit=10"}});
        let result = extract_pagination(PaginationScheme::Cursor, &response);

        assert_eq!(result.next_cursor(), Some("xyz"));
    }

    #[test]
    fn test_cursor_missing_link_or_parameter() {
        let no_link = json!({"results": [], "_links": {"base": "https://acme.atlassian.net/wiki"}});
        let no_param = json!({"_links": {"next": "/wiki/api/v2/pages?limit=25"}});
        let similar_name = json!({"_links": {"next": "/wiki/api/v2/pages?precursor=zzz"}});

        assert!(!extract_pagination(PaginationScheme::Cursor, &no_link).has_more());
        assert!(!extract_pagination(PaginationScheme::Cursor, &no_param).has_more());
        assert!(!extract_pagination(PaginationScheme::Cursor, &similar_name).has_more());
    }

    #[test]
    fn test_cursor_invalid_percent_encoding_degrades() {
        let response = json!({"_links": {"next": "/x?cursor=%FF%FE"}});
        let result = extract_pagination(PaginationScheme::Cursor, &response);

        assert!(!result.has_more());
    }

    #[test]
    fn test_page_absolute_url() {
        let response = json!({"values": [], "next": "https://host/x?page=3"});
        let result = extract_pagination(PaginationScheme::Page, &response);

        assert_eq!(result.next_cursor(), Some("3"));
        assert!(result.has_more());
    }

    #[test]
    fn test_page_relative_url_and_missing_parameter() {
        let relative = json!({"next": "/2.0/repositories/ws/repo/pullrequests?pagelen=10&page=2"});
        let without_page = json!({"next": "https://host/x?pagelen=10"});

        assert_eq!(
            extract_pagination(PaginationScheme::Page, &relative).next_cursor(),
            Some("2")
        );
        assert!(!extract_pagination(PaginationScheme::Page, &without_page).has_more());
    }

    #[test]
    fn test_page_unparseable_url_degrades() {
        let response = json!({"next": "http://[::1"});
        let result = extract_pagination(PaginationScheme::Page, &response);

        assert!(!result.has_more());
    }

    #[test]
    fn test_pagination_result_serialization() {
        let more = serde_json::to_value(PaginationResult::new(Some("abc".to_string()))).unwrap();
        let done = serde_json::to_value(PaginationResult::done()).unwrap();

        assert_eq!(more, json!({"nextCursor": "abc", "hasMore": true}));
        assert_eq!(done, json!({"hasMore": false}));
    }
}
