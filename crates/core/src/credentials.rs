//! Credential resolution
//!
//! Credentials are resolved fresh on every call from the configuration snapshot.
//! Resolution never fails loudly: an incomplete snapshot yields `None` and a
//! warning, and the caller turns that into [`crate::error::TransportError::AuthMissing`].

use crate::config::AtlassianConfig;

/// Complete set of values needed to authenticate against an Atlassian site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub site_name: String,
    pub user_email: String,
    pub api_token: String,
}

/// Resolve credentials from the configuration snapshot
///
/// Returns `Some` only when site name, user email and API token are all
/// non-empty. A partially populated value is never returned.
pub fn resolve_credentials(config: &AtlassianConfig) -> Option<Credentials> {
    let site_name = non_empty(config.site_name.as_deref());
    let user_email = non_empty(config.user_email.as_deref());
    let api_token = non_empty(config.api_token.as_deref());

    match (site_name, user_email, api_token) {
        (Some(site_name), Some(user_email), Some(api_token)) => Some(Credentials {
            site_name: site_name.to_string(),
            user_email: user_email.to_string(),
            api_token: api_token.to_string(),
        }),
        (site_name, user_email, api_token) => {
            let missing: Vec<&str> = [
                ("ATLASSIAN_SITE_NAME", site_name.is_none()),
                ("ATLASSIAN_USER_EMAIL", user_email.is_none()),
                ("ATLASSIAN_API_TOKEN", api_token.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();

            log::warn!(
                "Atlassian credentials are incomplete, missing: {}",
                missing.join(", ")
            );
            None
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config() -> AtlassianConfig {
        AtlassianConfig {
            site_name: Some("acme".to_string()),
            user_email: Some("dev@acme.test".to_string()),
            api_token: Some("secret-token".to_string()),
            cookie: None,
            debug: false,
        }
    }

    #[test]
    fn test_resolve_credentials_complete() {
        let creds = resolve_credentials(&full_config()).unwrap();

        assert_eq!(creds.site_name, "acme");
        assert_eq!(creds.user_email, "dev@acme.test");
        assert_eq!(creds.api_token, "secret-token");
    }

    #[test]
    fn test_resolve_credentials_trims_values() {
        let config = AtlassianConfig {
            site_name: Some("  acme ".to_string()),
            ..full_config()
        };

        let creds = resolve_credentials(&config).unwrap();
        assert_eq!(creds.site_name, "acme");
    }

    #[test]
    fn test_resolve_credentials_missing_any_field() {
        let without_site = AtlassianConfig {
            site_name: None,
            ..full_config()
        };
        let without_email = AtlassianConfig {
            user_email: None,
            ..full_config()
        };
        let without_token = AtlassianConfig {
            api_token: None,
            ..full_config()
        };

        assert_eq!(resolve_credentials(&without_site), None);
        assert_eq!(resolve_credentials(&without_email), None);
        assert_eq!(resolve_credentials(&without_token), None);
    }

    #[test]
    fn test_resolve_credentials_empty_string_counts_as_missing() {
        let config = AtlassianConfig {
            api_token: Some(String::new()),
            ..full_config()
        };
        assert_eq!(resolve_credentials(&config), None);
    }

    #[test]
    fn test_resolve_credentials_cookie_does_not_substitute() {
        let config = AtlassianConfig {
            api_token: None,
            cookie: Some("session=abc".to_string()),
            ..full_config()
        };
        assert_eq!(resolve_credentials(&config), None);
    }
}
