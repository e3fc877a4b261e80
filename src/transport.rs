//! The transport adapter seam.
//!
//! The caller-supplied fetch function is an external collaborator
//! abstracting over two distinct async byte-source shapes (pull-readers vs.
//! push-iterators). In Rust both collapse to a single
//! `Stream<Item = Result<Bytes, std::io::Error>>`, so the seam here is a
//! trait with exactly one production implementation ([`ReqwestTransport`]).

use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use futures_core::Stream;
use reqwest::{Client, StatusCode};
use url::Url;

/// A normalized async byte-chunk source. Whatever shape the underlying
/// transport produces (pull-reader or push-sequence) is collapsed into this
/// single stream at the transport seam — the multipart parser and merger
/// never see the distinction.
pub struct BodyStream(pub Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>);

impl BodyStream {
    /// Wrap any `Send` byte-chunk stream.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = std::io::Result<Bytes>> + Send + 'static,
    {
        Self(Box::pin(stream))
    }
}

impl Stream for BodyStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.0.as_mut().poll_next(cx)
    }
}

/// The HTTP method and payload of one logical request attempt.
#[derive(Debug, Clone)]
pub struct RequestParams {
    /// Always `POST` for this client, but kept explicit for the retry log
    /// event's `requestParams` field and for a future non-POST transport.
    pub method: &'static str,
    /// Flat, comma-joined headers (post-merge; see [`crate::config::merge_headers`]).
    pub headers: HashMap<String, String>,
    /// The serialized JSON request envelope body.
    pub body: Vec<u8>,
}

/// A response from the transport, normalized to the fields the executor and
/// client façade need.
pub struct RawResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// The canonical reason phrase for `status` (`"Service Unavailable"`, etc.).
    pub status_text: String,
    /// `status.is_success()`.
    pub ok: bool,
    /// Response headers, notably `content-type`.
    pub headers: reqwest::header::HeaderMap,
    /// The response body, normalized to a single byte-chunk stream.
    pub body: BodyStream,
}

impl RawResponse {
    /// The `content-type` header value, if present and valid UTF-8.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

/// The transport adapter contract: issue one HTTP request and return its
/// response, or an error if the request could not be completed at all
/// (network abort, DNS failure, connection reset, etc).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a single request attempt. Implementations must not retry —
    /// retrying is the executor's job.
    async fn send(&self, url: &Url, params: &RequestParams) -> Result<RawResponse, String>;
}

/// The default [`Transport`] implementation, backed by a `reqwest::Client`.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport with the given per-request timeout.
    ///
    /// Every request carries a default `Content-Type: application/json`
    /// header so the server can parse the POSTed body without the caller
    /// having to remember to set it on every call.
    pub fn new(timeout: Duration) -> Self {
        let mut default_headers = reqwest::header::HeaderMap::new();
        default_headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()
            .expect("reqwest::Client::builder() with only a timeout and default headers never fails");
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, url: &Url, params: &RequestParams) -> Result<RawResponse, String> {
        let mut builder = self.client.post(url.clone()).body(params.body.clone());
        for (name, value) in &params.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|e| e.to_string())?;

        let status = response.status();
        let status_text = status
            .canonical_reason()
            .unwrap_or("Unknown Status")
            .to_string();
        let ok = status.is_success();
        let headers = response.headers().clone();

        let byte_stream = response
            .bytes_stream()
            .map_err(std::io::Error::other);

        Ok(RawResponse {
            status,
            status_text,
            ok,
            headers,
            body: BodyStream::new(byte_stream),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_reads_header() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            "application/json".parse().unwrap(),
        );
        let resp = RawResponse {
            status: StatusCode::OK,
            status_text: "OK".into(),
            ok: true,
            headers,
            body: BodyStream::new(futures::stream::empty()),
        };
        assert_eq!(resp.content_type(), Some("application/json"));
    }
}
