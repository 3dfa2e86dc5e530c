//! Immutable configuration snapshot
//!
//! The shell builds one [`AtlassianConfig`] from CLI flags and environment
//! variables and hands it, by reference, to everything that needs it. Nothing in
//! this crate reads the process environment directly.

/// Atlassian connection settings as supplied by the operator
///
/// Every field is optional here; [`crate::credentials::resolve_credentials`]
/// decides whether the snapshot is complete enough to authenticate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtlassianConfig {
    /// Site name (`mycompany`), host (`mycompany.atlassian.net`) or full base URL
    pub site_name: Option<String>,
    pub user_email: Option<String>,
    pub api_token: Option<String>,
    /// Ambient session cookie; when present it replaces basic auth
    pub cookie: Option<String>,
    pub debug: bool,
}

impl AtlassianConfig {
    /// Ambient cookie, ignoring blank values
    pub fn ambient_cookie(&self) -> Option<&str> {
        self.cookie
            .as_deref()
            .map(str::trim)
            .filter(|cookie| !cookie.is_empty())
    }
}
