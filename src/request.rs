//! Request envelope construction.

use serde::Serialize;
use serde_json::Value;

/// The wire-level GraphQL request body: always a POST with a JSON body of
/// this shape. `variables` is omitted entirely (not serialized as `null`)
/// when absent.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RequestEnvelope {
    /// The operation string as supplied by the caller.
    pub query: String,
    /// GraphQL variables, omitted from the serialized body when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
}

impl RequestEnvelope {
    /// Build an envelope for `operation` with optional `variables`.
    pub fn new(operation: impl Into<String>, variables: Option<Value>) -> Self {
        Self {
            query: operation.into(),
            variables,
        }
    }

    /// Serialize this envelope to the JSON bytes sent as the request body.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
