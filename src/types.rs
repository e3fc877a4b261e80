//! Response shapes returned by [`crate::client::Client`].
//!
//! These mirror the wire-level GraphQL response shape plus the
//! error-wrapper conventions used across the client. Callers get
//! [`serde_json::Value`] trees rather than generated types — response typing
//! is explicitly out of scope for this crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The error payload attached to a failed [`ClientResponse`] or
/// [`ClientStreamResponse`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorPayload {
    /// HTTP status code, when the failure originated at the transport layer.
    #[serde(rename = "networkStatusCode", skip_serializing_if = "Option::is_none")]
    pub network_status_code: Option<u16>,

    /// Deterministic, label-prefixed message (see [`crate::errors::format_error_message`]).
    pub message: String,

    /// The GraphQL `errors` array from the payload, when the failure carried one.
    #[serde(rename = "graphQLErrors", skip_serializing_if = "Option::is_none")]
    pub graphql_errors: Option<Vec<Value>>,
}

impl ErrorPayload {
    /// Build a payload carrying only a message (transport-level failures).
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            network_status_code: None,
            message: message.into(),
            graphql_errors: None,
        }
    }

    /// Build a payload for a non-ok/unexpected-content-type HTTP response.
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            network_status_code: Some(status),
            message: message.into(),
            graphql_errors: None,
        }
    }

    /// Attach a collected `graphQLErrors` list to this payload.
    pub fn with_graphql_errors(mut self, errors: Vec<Value>) -> Self {
        self.graphql_errors = Some(errors);
        self
    }
}

/// The single-response result of [`crate::client::Client::request`].
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClientResponse {
    /// The `data` object from the GraphQL response, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// The `extensions` object from the GraphQL response, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,

    /// The error wrapper, populated on any failure path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorPayload>,
}

/// One snapshot yielded by [`crate::client::Client::request_stream`].
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClientStreamResponse {
    /// The merged `data` tree accumulated so far, when non-empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// The most recent non-null `extensions` object seen so far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,

    /// The error wrapper, populated if this snapshot is a terminal failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorPayload>,

    /// Whether the server signaled more incremental payloads are coming.
    #[serde(rename = "hasNext")]
    pub has_next: bool,
}

/// One raw part payload as it appears on the multipart wire,
/// before path-lifting and merging.
#[derive(Debug, Clone, Deserialize)]
pub struct IncrementalPayload {
    /// The fragment of data this payload carries, possibly scoped by `path`.
    #[serde(default)]
    pub data: Option<Value>,

    /// The path at which `data` should be lifted into the combined tree.
    #[serde(default)]
    pub path: Option<Vec<PathSegment>>,

    /// Whether more payloads follow this one.
    #[serde(rename = "hasNext")]
    pub has_next: bool,

    /// Extensions carried by this specific payload, if any.
    #[serde(default)]
    pub extensions: Option<Value>,

    /// GraphQL errors carried by this specific payload, if any.
    #[serde(default)]
    pub errors: Option<Vec<Value>>,
}

/// One segment of an incremental-delivery `path`: either an object key or an
/// array index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PathSegment {
    /// An object key.
    Key(String),
    /// An array index.
    Index(usize),
}
