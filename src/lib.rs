#![deny(clippy::all)]

//! A retrying, `@defer`-aware GraphQL-over-HTTP client.
//!
//! This crate accepts a GraphQL operation string (plus variables) and
//! returns either a single response ([`Client::request`]) or a stream of
//! incremental responses when the operation uses the `@defer` directive
//! ([`Client::request_stream`]). The three hard parts are a retrying HTTP
//! executor, a response discriminator, and a multipart incremental-delivery
//! parser — see `DESIGN.md` for implementation notes.

pub mod client;
pub mod config;
pub mod errors;
pub mod executor;
pub mod merge;
pub mod multipart;
pub mod request;
pub mod transport;
pub mod types;

pub use client::Client;
pub use config::{ClientConfig, HeaderValue, RequestOptions};
pub use errors::ClientError;
pub use types::{ClientResponse, ClientStreamResponse, ErrorPayload};

/// Result type alias used throughout this crate's public API.
pub type Result<T> = std::result::Result<T, ClientError>;
