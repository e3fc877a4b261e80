//! Error types surfaced by the GraphQL client.
//!
//! The wire-visible variants below produce the exact, deterministic message
//! strings callers (and this crate's own tests) match against. Every message
//! is prefixed with [`CLIENT_LABEL`] via [`format_error_message`], mirroring
//! the retry/executor layer's own formatting.

/// Fixed label prepended to every user-visible error message.
pub const CLIENT_LABEL: &str = "GraphQL Client";

/// Errors raised by [`crate::client::Client::fetch`]/[`crate::client::Client::request`]
/// and by the retry executor underneath them.
#[derive(thiserror::Error, Debug, Clone)]
pub enum ClientError {
    /// A `retries` value outside `[0, 3]` was supplied.
    #[error(
        "{label}: The provided \"retries\" value ({value}) is invalid - it cannot be less than 0 or greater than 3",
        label = CLIENT_LABEL
    )]
    InvalidRetries {
        /// The out-of-range value the caller supplied.
        value: i64,
    },

    /// `request` was called with an operation containing `@defer`.
    #[error(
        "This operation will result in a streamable response — use the streaming entry point instead."
    )]
    UnexpectedDefer,

    /// `request_stream` was called with an operation that does not contain `@defer`.
    #[error("operation does not result in a streamable response")]
    MissingDefer,

    /// Every retry attempt was exhausted without the transport ever returning a response.
    #[error(
        "{label}: Attempted maximum number of {max_retries} network retries. Last message - {last_message}",
        label = CLIENT_LABEL
    )]
    NetworkExhausted {
        /// The configured retry budget.
        max_retries: u8,
        /// The transport error message from the final attempt.
        last_message: String,
    },

    /// The transport failed and `max_retries` was `0`, so no retry was attempted.
    #[error("{label}: {message}", label = CLIENT_LABEL)]
    Transport {
        /// The transport error message.
        message: String,
    },
}

impl ClientError {
    /// Build the [`ClientError::InvalidRetries`] variant for a given value.
    pub fn invalid_retries(value: i64) -> Self {
        Self::InvalidRetries { value }
    }
}

/// Prefix `message` with [`CLIENT_LABEL`] unless it is already prefixed.
///
/// Callers that already embed the label (for example, a message built from a
/// lower error that was already formatted) are passed through unchanged.
pub fn format_error_message(message: impl AsRef<str>) -> String {
    let message = message.as_ref();
    let prefix = format!("{CLIENT_LABEL}: ");
    if message.starts_with(&prefix) {
        message.to_string()
    } else {
        format!("{prefix}{message}")
    }
}

/// Validate a per-call or default retry count against the `[0, 3]` budget.
pub fn validate_retries(retries: i64) -> Result<u8, ClientError> {
    if (0..=3).contains(&retries) {
        Ok(retries as u8)
    } else {
        Err(ClientError::invalid_retries(retries))
    }
}
