//! Pure request assembly for Atlassian API calls
//!
//! Everything the transport needs before touching the network: base URL
//! resolution, path normalization, header merging, auth selection and the
//! redacted curl rendering used for diagnostics.

use std::borrow::Cow;
use std::time::Duration;

use base64::Engine;
use serde_json::Value;

use crate::config::AtlassianConfig;
use crate::credentials::Credentials;

const REDACTED: &str = "[REDACTED]";

/// Headers whose values never appear in diagnostics
const SECRET_HEADERS: [&str; 3] = ["authorization", "cookie", "proxy-authorization"];

/// HTTP method of an outbound request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call request options
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    /// Header overrides; these win over the base JSON headers
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Supersedes the ambient cookie and disables basic auth
    pub cookie_override: Option<String>,
    pub query: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie_override = Some(cookie.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Add a query pair only when a value is present
    pub fn query_opt(self, name: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(name, value),
            None => self,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Authentication attached to a request. Cookie and basic auth never coexist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    Cookie(String),
    /// Base64 of `email:token`
    Basic(String),
}

impl Auth {
    fn header(&self) -> (&'static str, String) {
        match self {
            Auth::Cookie(cookie) => ("Cookie", cookie.clone()),
            Auth::Basic(encoded) => ("Authorization", format!("Basic {encoded}")),
        }
    }
}

/// Select authentication: per-call cookie, then ambient cookie, then basic auth
pub fn select_auth(
    cookie_override: Option<&str>,
    config: &AtlassianConfig,
    credentials: &Credentials,
) -> Auth {
    let cookie = cookie_override
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .or_else(|| config.ambient_cookie());

    match cookie {
        Some(cookie) => Auth::Cookie(cookie.to_string()),
        None => {
            let pair = format!("{}:{}", credentials.user_email, credentials.api_token);
            Auth::Basic(base64::engine::general_purpose::STANDARD.encode(pair))
        }
    }
}

/// Resolve the site base URL
///
/// Values with a scheme are used verbatim, hosts get `https://`, and bare site
/// names expand to their Atlassian Cloud host.
pub fn base_url(site_name: &str) -> String {
    let site = site_name.trim().trim_end_matches('/');

    if site.starts_with("https://") || site.starts_with("http://") {
        site.to_string()
    } else if site.contains('.') || site.contains(':') {
        format!("https://{site}")
    } else {
        format!("https://{site}.atlassian.net")
    }
}

/// Make sure a resource path starts with `/`
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if path.starts_with('/') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("/{path}"))
    }
}

/// Base JSON headers merged with caller overrides; overrides win
pub fn merge_headers(overrides: &[(String, String)]) -> Vec<(String, String)> {
    let mut headers = vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Accept".to_string(), "application/json".to_string()),
    ];

    for (name, value) in overrides {
        set_header(&mut headers, name, value.clone());
    }

    headers
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    match headers
        .iter_mut()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
    {
        Some(entry) => entry.1 = value,
        None => headers.push((name.to_string(), value)),
    }
}

/// Fully assembled request, ready to hand to an HTTP client
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// Assemble the request for `path` on the credentials' site
pub fn prepare_request(
    config: &AtlassianConfig,
    credentials: &Credentials,
    path: &str,
    options: &RequestOptions,
) -> Result<PreparedRequest, serde_json::Error> {
    let mut url = format!("{}{}", base_url(&credentials.site_name), normalize_path(path));
    if !options.query.is_empty() {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(options.query.iter())
            .finish();
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&query);
    }

    let mut headers = merge_headers(&options.headers);
    let auth = select_auth(options.cookie_override.as_deref(), config, credentials);
    let (auth_name, auth_value) = auth.header();
    headers.retain(|(name, _)| {
        !name.eq_ignore_ascii_case("authorization") && !name.eq_ignore_ascii_case("cookie")
    });
    headers.push((auth_name.to_string(), auth_value));

    let body = options.body.as_ref().map(serde_json::to_string).transpose()?;

    Ok(PreparedRequest {
        method: options.method,
        url,
        headers,
        body,
    })
}

impl PreparedRequest {
    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Reproducible curl command line with secret headers redacted
    pub fn to_curl(&self) -> String {
        let mut parts = vec!["curl".to_string(), "-X".to_string(), self.method.to_string()];

        for (name, value) in &self.headers {
            let value = if SECRET_HEADERS
                .iter()
                .any(|secret| secret.eq_ignore_ascii_case(name))
            {
                REDACTED
            } else {
                value.as_str()
            };
            parts.push("-H".to_string());
            parts.push(shell_quote(&format!("{name}: {value}")));
        }

        if let Some(body) = &self.body {
            parts.push("-d".to_string());
            parts.push(shell_quote(body));
        }

        parts.push(shell_quote(&self.url));
        parts.join(" ")
    }
}

fn shell_quote(value: &str) -> String {
    match shlex::try_quote(value) {
        Ok(quoted) => quoted.into_owned(),
        Err(_) => format!("'{}'", value.replace('\0', "").replace('\'', r"'\''")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn credentials() -> Credentials {
        Credentials {
            site_name: "acme".to_string(),
            user_email: "dev@acme.test".to_string(),
            api_token: "secret-token".to_string(),
        }
    }

    #[test]
    fn test_base_url_variants() {
        assert_eq!(base_url("acme"), "https://acme.atlassian.net");
        assert_eq!(base_url("wiki.acme.io"), "https://wiki.acme.io");
        assert_eq!(base_url("http://localhost:8080/"), "http://localhost:8080");
        assert_eq!(base_url("https://acme.atlassian.net"), "https://acme.atlassian.net");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("wiki/api/v2/spaces"), "/wiki/api/v2/spaces");
        assert_eq!(normalize_path("/wiki/api/v2/spaces"), "/wiki/api/v2/spaces");
    }

    #[test]
    fn test_merge_headers_caller_wins() {
        let headers = merge_headers(&[
            ("accept".to_string(), "text/html".to_string()),
            ("X-Trace".to_string(), "1".to_string()),
        ]);

        assert_eq!(
            headers,
            vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Accept".to_string(), "text/html".to_string()),
                ("X-Trace".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_select_auth_priority() {
        let creds = credentials();
        let ambient = AtlassianConfig {
            cookie: Some("ambient=1".to_string()),
            ..Default::default()
        };

        assert_eq!(
            select_auth(Some("override=1"), &ambient, &creds),
            Auth::Cookie("override=1".to_string())
        );
        assert_eq!(
            select_auth(None, &ambient, &creds),
            Auth::Cookie("ambient=1".to_string())
        );
        assert_eq!(
            select_auth(None, &AtlassianConfig::default(), &creds),
            Auth::Basic("ZGV2QGFjbWUudGVzdDpzZWNyZXQtdG9rZW4=".to_string())
        );
    }

    #[test]
    fn test_prepare_request_basic_auth() {
        let options = RequestOptions::get().query("limit", 25).query("cursor", "a b=");
        let prepared = prepare_request(
            &AtlassianConfig::default(),
            &credentials(),
            "wiki/api/v2/spaces",
            &options,
        )
        .unwrap();

        assert_eq!(
            prepared.url,
            "https://acme.atlassian.net/wiki/api/v2/spaces?limit=25&cursor=a+b%3D"
        );
        assert_eq!(
            prepared.header("authorization"),
            Some("Basic ZGV2QGFjbWUudGVzdDpzZWNyZXQtdG9rZW4=")
        );
        assert_eq!(prepared.header("cookie"), None);
        assert_eq!(prepared.body, None);
    }

    #[test]
    fn test_prepare_request_cookie_suppresses_authorization() {
        let options = RequestOptions::get()
            .cookie("tenant.session.token=xyz")
            .header("Authorization", "Bearer sneaky");
        let prepared =
            prepare_request(&AtlassianConfig::default(), &credentials(), "/x", &options).unwrap();

        assert_eq!(prepared.header("cookie"), Some("tenant.session.token=xyz"));
        assert_eq!(prepared.header("authorization"), None);
    }

    #[test]
    fn test_prepare_request_serializes_body() {
        let options = RequestOptions::get()
            .method(Method::Post)
            .body(json!({"title": "Hello"}));
        let prepared =
            prepare_request(&AtlassianConfig::default(), &credentials(), "/x", &options).unwrap();

        assert_eq!(prepared.method, Method::Post);
        assert_eq!(prepared.body.as_deref(), Some(r#"{"title":"Hello"}"#));
    }

    #[test]
    fn test_to_curl_redacts_secrets() {
        let prepared = PreparedRequest {
            method: Method::Post,
            url: "https://acme.atlassian.net/wiki/api/v2/pages?limit=5".to_string(),
            headers: vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("Authorization".to_string(), "Basic c2VjcmV0".to_string()),
                ("cookie".to_string(), "session=abc".to_string()),
            ],
            body: Some(r#"{"q":"it's"}"#.to_string()),
        };

        let curl = prepared.to_curl();
        let args = shlex::split(&curl).unwrap();

        assert_eq!(&args[..3], ["curl", "-X", "POST"]);
        assert!(args.contains(&"Accept: application/json".to_string()));
        assert!(args.contains(&"Authorization: [REDACTED]".to_string()));
        assert!(args.contains(&"cookie: [REDACTED]".to_string()));
        assert!(args.contains(&r#"{"q":"it's"}"#.to_string()));
        assert_eq!(
            args.last().map(String::as_str),
            Some("https://acme.atlassian.net/wiki/api/v2/pages?limit=5")
        );
        assert!(!curl.contains("c2VjcmV0"));
        assert!(!curl.contains("session=abc"));
    }
}
