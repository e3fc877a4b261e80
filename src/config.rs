//! Client configuration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::errors::{validate_retries, ClientError};
use crate::transport::{ReqwestTransport, Transport};

/// A default header value: either a single string or a list of strings,
/// joined with `", "` when the request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// A single header value.
    Single(String),
    /// Multiple values for the same header name, comma-joined on send.
    Multi(Vec<String>),
}

impl HeaderValue {
    /// Render this value as it appears on the wire.
    pub fn joined(&self) -> String {
        match self {
            Self::Single(v) => v.clone(),
            Self::Multi(vs) => vs.join(", "),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for HeaderValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multi(values)
    }
}

/// Immutable configuration for the lifetime of a [`crate::client::Client`] instance.
///
/// Fields are private and reachable only through [`ClientConfigBuilder`] (or
/// [`ClientConfig::new`]/[`ClientConfig::from_env`], which go through it), so
/// `retries` can never reach the transport without passing `validate_retries`.
#[derive(Clone)]
pub struct ClientConfig {
    url: Url,
    headers: HashMap<String, HeaderValue>,
    retries: u8,
    transport: Arc<dyn Transport>,
}

impl ClientConfig {
    /// Build a config pointed at `url` with the environment's default transport
    /// (a bare [`ReqwestTransport`]) and no default headers or retries.
    pub fn new(url: Url) -> Result<Self, ClientError> {
        Self::builder(url).build()
    }

    /// The default endpoint URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Default headers, merged under per-call overrides in [`RequestOptions`].
    pub fn headers(&self) -> &HashMap<String, HeaderValue> {
        &self.headers
    }

    /// The default retry count, already validated to be in `[0, 3]`.
    pub fn retries(&self) -> u8 {
        self.retries
    }

    /// The transport adapter this config was built with.
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// Start a [`ClientConfigBuilder`] for `url`.
    pub fn builder(url: Url) -> ClientConfigBuilder {
        ClientConfigBuilder {
            url,
            headers: HashMap::new(),
            retries: 0,
            transport: None,
        }
    }

    /// Build a config from `GRAPHQL_CLIENT_ENDPOINT` / `GRAPHQL_CLIENT_TOKEN` /
    /// `GRAPHQL_CLIENT_RETRIES` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let endpoint = std::env::var("GRAPHQL_CLIENT_ENDPOINT")
            .map_err(|_| anyhow::anyhow!("Missing GRAPHQL_CLIENT_ENDPOINT in environment"))?;
        let url = Url::parse(&endpoint)?;

        let mut builder = Self::builder(url);

        if let Ok(token) = std::env::var("GRAPHQL_CLIENT_TOKEN") {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        if let Some(retries) = std::env::var("GRAPHQL_CLIENT_RETRIES")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
        {
            builder = builder.retries(retries)?;
        }

        Ok(builder.build()?)
    }
}

/// Builder for [`ClientConfig`].
pub struct ClientConfigBuilder {
    url: Url,
    headers: HashMap<String, HeaderValue>,
    retries: i64,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientConfigBuilder {
    /// Add a default header, overwriting any previous value for the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the default retry budget. Validated immediately against `[0, 3]`.
    pub fn retries(mut self, retries: i64) -> Result<Self, ClientError> {
        validate_retries(retries)?;
        self.retries = retries;
        Ok(self)
    }

    /// Replace the default [`ReqwestTransport`] with a custom [`Transport`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Finish building, validating `retries` and constructing the default
    /// transport if none was supplied.
    pub fn build(self) -> Result<ClientConfig, ClientError> {
        let retries = validate_retries(self.retries)?;
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new(Duration::from_secs(30))),
        };
        Ok(ClientConfig {
            url: self.url,
            headers: self.headers,
            retries,
            transport,
        })
    }
}

/// Per-call overrides. Unset fields fall back to the client's defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// GraphQL variables for this operation.
    pub variables: Option<serde_json::Value>,
    /// Override the default endpoint for this call only.
    pub url: Option<Url>,
    /// Headers merged over the client's defaults; per-call values win.
    pub headers: HashMap<String, HeaderValue>,
    /// Override the default retry budget for this call only.
    pub retries: Option<i64>,
}

impl RequestOptions {
    /// An empty set of overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach GraphQL variables.
    pub fn with_variables(mut self, variables: serde_json::Value) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Override the endpoint for this call.
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Add (or overwrite) a per-call header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Override the retry budget for this call.
    pub fn with_retries(mut self, retries: i64) -> Self {
        self.retries = Some(retries);
        self
    }
}

/// Merge default and per-call headers into the flat, comma-joined map sent
/// on the wire, with per-call values taking precedence.
pub fn merge_headers(
    defaults: &HashMap<String, HeaderValue>,
    overrides: &HashMap<String, HeaderValue>,
) -> HashMap<String, String> {
    let mut merged: HashMap<String, HeaderValue> = defaults.clone();
    for (name, value) in overrides {
        merged.insert(name.clone(), value.clone());
    }
    merged
        .into_iter()
        .map(|(name, value)| (name, value.joined()))
        .collect()
}
