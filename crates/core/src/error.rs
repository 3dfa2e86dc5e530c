//! Error taxonomy for Atlassian API exchanges
//!
//! Every failed exchange is reported as exactly one [`TransportError`] kind.
//! This module holds the pure half of classification: HTTP status plus raw body
//! to a kind, and foreign error values to a kind. The reqwest-specific half
//! lives next to the transport in the binary crate.

use std::time::Duration;

use serde_json::Value;

/// Boxed foreign error carried by [`TransportError::Unexpected`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Fixed message for 401/403 responses. Body detail is not surfaced.
pub const AUTH_INVALID_MESSAGE: &str =
    "Authentication failed: the Atlassian credentials are invalid or lack permission";

/// Classified failure of an Atlassian API exchange
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("Authentication credentials are missing: set ATLASSIAN_SITE_NAME, ATLASSIAN_USER_EMAIL and ATLASSIAN_API_TOKEN")]
    AuthMissing,

    #[error("{}", AUTH_INVALID_MESSAGE)]
    AuthInvalid,

    #[error("Resource not found")]
    NotFound { body: String },

    #[error("Atlassian API error [{status}]: {message}")]
    ApiError {
        status: u16,
        body: String,
        message: String,
    },

    #[error("Network or parse error: {0}")]
    NetworkOrParse(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Unexpected error: {0}")]
    Unexpected(#[source] BoxError),
}

impl TransportError {
    /// Classify an arbitrary error value
    ///
    /// Values that already belong to the taxonomy pass through unchanged. JSON
    /// and I/O failures become [`TransportError::NetworkOrParse`]; anything else
    /// is wrapped in [`TransportError::Unexpected`].
    pub fn classify(err: BoxError) -> Self {
        let err = match err.downcast::<TransportError>() {
            Ok(classified) => return *classified,
            Err(err) => err,
        };
        let err = match err.downcast::<serde_json::Error>() {
            Ok(parse) => return TransportError::NetworkOrParse(parse.to_string()),
            Err(err) => err,
        };
        match err.downcast::<std::io::Error>() {
            Ok(io) => TransportError::NetworkOrParse(io.to_string()),
            Err(err) => TransportError::Unexpected(err),
        }
    }

    /// Operator-fixable by supplying or rotating credentials
    pub fn is_auth(&self) -> bool {
        matches!(self, TransportError::AuthMissing | TransportError::AuthInvalid)
    }

    /// Failures that say nothing about the request itself
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::NetworkOrParse(_)
                | TransportError::TimedOut(_)
                | TransportError::Unexpected(_)
        )
    }

    /// HTTP status attached to the failure, when the remote answered
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::NotFound { .. } => Some(404),
            TransportError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::NetworkOrParse(err.to_string())
    }
}

/// Classify a non-success HTTP response
///
/// # Arguments
/// * `status` - HTTP status code
/// * `status_text` - Canonical reason phrase for the status
/// * `body` - Raw response body
pub fn classify_status(status: u16, status_text: &str, body: &str) -> TransportError {
    match status {
        401 | 403 => TransportError::AuthInvalid,
        404 => TransportError::NotFound {
            body: body.to_string(),
        },
        _ => TransportError::ApiError {
            status,
            body: body.to_string(),
            message: derive_error_message(status, status_text, body),
        },
    }
}

/// Pick the most useful human message out of an error body
///
/// Preference order: `errors[0].title`, top-level `message`, the status text.
pub fn derive_error_message(status: u16, status_text: &str, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    parsed
        .as_ref()
        .and_then(|value| {
            first_error_title(value).or_else(|| value.get("message").and_then(Value::as_str))
        })
        .filter(|message| !message.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            if status_text.is_empty() {
                format!("HTTP {status}")
            } else {
                status_text.to_string()
            }
        })
}

fn first_error_title(value: &Value) -> Option<&str> {
    value
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(|first| first.get("title"))
        .and_then(Value::as_str)
}
