//! Authenticated HTTP exchange with the Atlassian REST APIs
//!
//! [`Transport`] performs exactly one request per call: it assembles the request
//! with the pure helpers from `confluence_mcp_core::request`, sends it with
//! reqwest, and returns either the parsed JSON payload or a classified
//! [`TransportError`]. It never retries and never caches.

use std::sync::Arc;
use std::time::Duration;

use confluence_mcp_core::config::AtlassianConfig;
use confluence_mcp_core::credentials::{resolve_credentials, Credentials};
use confluence_mcp_core::error::{classify_status, TransportError};
use confluence_mcp_core::request::{base_url, prepare_request, PreparedRequest, RequestOptions};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// HTTP transport shared by every Confluence operation
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    config: Arc<AtlassianConfig>,
    cancel: CancellationToken,
}

impl Transport {
    /// Create a transport bound to an immutable configuration snapshot
    pub fn new(config: Arc<AtlassianConfig>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("confluence-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Unexpected(Box::new(e)))?;

        Ok(Self {
            client,
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Abandon in-flight requests made through [`Transport::request`] once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Build a transport from the CLI global options
    pub fn from_global(global: &crate::Global) -> Result<Self, TransportError> {
        Ok(Self::new(Arc::new(global.config()))?.with_cancellation(global.cancel.clone()))
    }

    /// Resolve credentials fresh from the configuration snapshot
    ///
    /// An incomplete snapshot becomes [`TransportError::AuthMissing`].
    pub fn credentials(&self) -> Result<Credentials, TransportError> {
        resolve_credentials(&self.config).ok_or(TransportError::AuthMissing)
    }

    /// Base URL of the Confluence application (`https://<site>/wiki`)
    pub fn wiki_base(credentials: &Credentials) -> String {
        format!("{}/wiki", base_url(&credentials.site_name))
    }

    /// Perform one authenticated request and parse the JSON response
    ///
    /// The transport's own cancellation token applies.
    pub async fn request(
        &self,
        credentials: &Credentials,
        path: &str,
        options: RequestOptions,
    ) -> Result<Value, TransportError> {
        self.execute(credentials, path, options, &self.cancel).await
    }

    async fn execute(
        &self,
        credentials: &Credentials,
        path: &str,
        options: RequestOptions,
        cancel: &CancellationToken,
    ) -> Result<Value, TransportError> {
        let prepared = prepare_request(&self.config, credentials, path, &options)?;
        log::debug!("{}", prepared.to_curl());

        let exchange = self.exchange_with_timeout(prepared, options.timeout);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            result = exchange => result,
        }
    }

    async fn exchange_with_timeout(
        &self,
        prepared: PreparedRequest,
        timeout: Option<Duration>,
    ) -> Result<Value, TransportError> {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, self.exchange(prepared))
                .await
                .map_err(|_| TransportError::TimedOut(limit))?,
            None => self.exchange(prepared).await,
        }
    }

    async fn exchange(&self, prepared: PreparedRequest) -> Result<Value, TransportError> {
        let method = reqwest::Method::from_bytes(prepared.method.as_str().as_bytes())
            .map_err(|e| TransportError::Unexpected(Box::new(e)))?;

        let mut builder = self.client.request(method, &prepared.url);
        for (name, value) in &prepared.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = prepared.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify_reqwest_error)?;
        let status = response.status();
        log::debug!("{} {} -> {}", prepared.method, prepared.url, status);

        let text = response.text().await.map_err(classify_reqwest_error)?;

        if !status.is_success() {
            return Err(classify_status(
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
                &text,
            ));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&text)?)
    }
}

/// Classify a reqwest failure
///
/// Connection, body and decoding problems are network/parse failures; anything
/// else (builder errors, invalid headers) is unexpected.
pub fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_connect()
        || err.is_request()
        || err.is_body()
        || err.is_decode()
        || err.is_redirect()
        || err.is_timeout()
    {
        TransportError::NetworkOrParse(err.to_string())
    } else {
        TransportError::classify(Box::new(err))
    }
}
