//! The client façade: `fetch`, `request`, and `request_stream`.

use std::sync::LazyLock;

use futures::{Stream, StreamExt};
use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::config::{merge_headers, ClientConfig, RequestOptions};
use crate::errors::{format_error_message, validate_retries, ClientError};
use crate::executor::Executor;
use crate::merge::Accumulator;
use crate::multipart::part_batches;
use crate::request::RequestEnvelope;
use crate::transport::{RawResponse, RequestParams};
use crate::types::{ClientResponse, ClientStreamResponse, ErrorPayload, IncrementalPayload};

static DEFER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)@\s*defer\b").unwrap());

/// Whether `operation` textually contains an `@defer` directive. Deliberately a regex against the
/// raw string, not a GraphQL parse — callers rely on this being cheap and
/// side-effect-free.
pub fn contains_defer(operation: &str) -> bool {
    DEFER_RE.is_match(operation)
}

/// The GraphQL-over-HTTP client.
pub struct Client {
    config: ClientConfig,
    executor: Executor,
}

impl Client {
    /// Build a client from `config`.
    pub fn new(config: ClientConfig) -> Self {
        let executor = Executor::new(config.transport());
        Self { config, executor }
    }

    fn resolve_retries(&self, options: &RequestOptions) -> Result<u8, ClientError> {
        match options.retries {
            Some(value) => validate_retries(value),
            None => Ok(self.config.retries()),
        }
    }

    fn resolve_url(&self, options: &RequestOptions) -> Url {
        options
            .url
            .clone()
            .unwrap_or_else(|| self.config.url().clone())
    }

    fn build_request_params(
        &self,
        operation: &str,
        options: &RequestOptions,
    ) -> Result<RequestParams, ClientError> {
        let envelope = RequestEnvelope::new(operation, options.variables.clone());
        let body = envelope
            .to_bytes()
            .map_err(|e| ClientError::Transport {
                message: format_error_message(e.to_string()),
            })?;
        let headers = merge_headers(self.config.headers(), &options.headers);
        Ok(RequestParams {
            method: "POST",
            headers,
            body,
        })
    }

    /// Build the request envelope, validate `retries`, execute, and
    /// return the raw response with no further parsing or classification.
    pub async fn fetch(
        &self,
        operation: &str,
        options: RequestOptions,
    ) -> Result<RawResponse, ClientError> {
        let retries = self.resolve_retries(&options)?;
        let url = self.resolve_url(&options);
        let params = self.build_request_params(operation, &options)?;
        self.executor.execute(&url, &params, retries).await
    }

    /// The non-streaming entry point. Rejects `@defer` operations
    /// synchronously, then classifies the response into a [`ClientResponse`].
    pub async fn request(
        &self,
        operation: &str,
        options: RequestOptions,
    ) -> Result<ClientResponse, ClientError> {
        if contains_defer(operation) {
            return Err(ClientError::UnexpectedDefer);
        }

        let response = match self.fetch(operation, options).await {
            Ok(response) => response,
            Err(ClientError::NetworkExhausted { last_message, .. }) => {
                return Ok(ClientResponse {
                    errors: Some(ErrorPayload::message_only(format_error_message(
                        last_message,
                    ))),
                    ..Default::default()
                });
            }
            Err(ClientError::Transport { message }) => {
                return Ok(ClientResponse {
                    errors: Some(ErrorPayload::message_only(message)),
                    ..Default::default()
                });
            }
            Err(other) => return Err(other),
        };

        Ok(classify_single_response(response).await)
    }

    /// The streaming entry point. Rejects non-`@defer` operations
    /// synchronously, then returns a stream of [`ClientStreamResponse`]
    /// snapshots.
    pub async fn request_stream(
        &self,
        operation: &str,
        options: RequestOptions,
    ) -> Result<impl Stream<Item = ClientStreamResponse>, ClientError> {
        if !contains_defer(operation) {
            return Err(ClientError::MissingDefer);
        }

        let response = match self.fetch(operation, options).await {
            Ok(response) => Ok(response),
            Err(ClientError::NetworkExhausted { last_message, .. }) => {
                Err(format_error_message(last_message))
            }
            Err(ClientError::Transport { message }) => Err(message),
            Err(other) => return Err(other),
        };

        Ok(stream_response(response))
    }
}

/// Classification for the non-streaming path, shared with the
/// single-JSON-response branch of `request_stream`.
async fn classify_single_response(mut response: RawResponse) -> ClientResponse {
    if !response.ok {
        return ClientResponse {
            errors: Some(ErrorPayload::with_status(
                response.status.as_u16(),
                format_error_message(response.status_text.clone()),
            )),
            ..Default::default()
        };
    }

    let content_type = response.content_type().unwrap_or("").to_string();
    if !content_type.contains("application/json") {
        return ClientResponse {
            errors: Some(ErrorPayload::with_status(
                response.status.as_u16(),
                format_error_message(format!(
                    "Response returned unexpected Content-Type: {content_type}"
                )),
            )),
            ..Default::default()
        };
    }

    let bytes = match collect_body(&mut response).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return ClientResponse {
                errors: Some(ErrorPayload::with_status(
                    response.status.as_u16(),
                    format_error_message(e),
                )),
                ..Default::default()
            };
        }
    };

    let parsed: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            return ClientResponse {
                errors: Some(ErrorPayload::with_status(
                    response.status.as_u16(),
                    format_error_message(e.to_string()),
                )),
                ..Default::default()
            };
        }
    };

    build_client_response(response.status.as_u16(), parsed)
}

/// Turn a parsed `{data?, errors?, extensions?}` JSON body into a
/// [`ClientResponse`].
fn build_client_response(status: u16, parsed: Value) -> ClientResponse {
    let data = parsed.get("data").cloned().filter(|v| !v.is_null());
    let extensions = parsed.get("extensions").cloned().filter(|v| !v.is_null());
    let graphql_errors = parsed
        .get("errors")
        .and_then(|v| v.as_array())
        .filter(|errs| !errs.is_empty())
        .cloned();

    if graphql_errors.is_some() || data.is_none() {
        let message = if graphql_errors.is_some() {
            "An error occurred while fetching from the API. Review 'graphQLErrors' for details."
        } else {
            "An unknown error has occurred. The API did not return a data object or any errors in its response."
        };
        let mut payload = ErrorPayload::with_status(status, format_error_message(message));
        if let Some(errors) = graphql_errors {
            payload = payload.with_graphql_errors(errors);
        }
        return ClientResponse {
            data,
            extensions,
            errors: Some(payload),
        };
    }

    ClientResponse {
        data,
        extensions,
        errors: None,
    }
}

async fn collect_body(response: &mut RawResponse) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::new();
    while let Some(chunk) = response.body.next().await {
        bytes.extend_from_slice(&chunk.map_err(|e| e.to_string())?);
    }
    Ok(bytes)
}

/// Dispatch the already-fetched (or already-failed) response into a
/// [`ClientStreamResponse`] stream.
fn stream_response(
    response: Result<RawResponse, String>,
) -> impl Stream<Item = ClientStreamResponse> {
    async_stream::stream! {
        let mut response = match response {
            Ok(response) => response,
            Err(message) => {
                yield ClientStreamResponse {
                    errors: Some(ErrorPayload::message_only(format_error_message(message))),
                    has_next: false,
                    ..Default::default()
                };
                return;
            }
        };

        if !response.ok {
            yield ClientStreamResponse {
                errors: Some(ErrorPayload::with_status(
                    response.status.as_u16(),
                    format_error_message(response.status_text.clone()),
                )),
                has_next: false,
                ..Default::default()
            };
            return;
        }

        let content_type = response.content_type().unwrap_or("").to_string();

        if content_type.contains("application/json") {
            let classified = classify_single_response(response).await;
            yield ClientStreamResponse {
                data: classified.data,
                extensions: classified.extensions,
                errors: classified.errors,
                has_next: false,
            };
            return;
        }

        if !content_type.contains("multipart/mixed") {
            yield ClientStreamResponse {
                errors: Some(ErrorPayload::with_status(
                    response.status.as_u16(),
                    format_error_message(format!(
                        "Response returned unexpected Content-Type: {content_type}"
                    )),
                )),
                has_next: false,
                ..Default::default()
            };
            return;
        }

        let status = response.status.as_u16();
        let mut acc = Accumulator::new();
        let mut batches = part_batches(response.body, &content_type);

        // A snapshot isn't yielded the moment a batch is merged — it's held
        // here until the next batch (or EOF) confirms what happens after it.
        // Premature termination then replaces the held snapshot with an
        // error instead of the caller seeing both.
        let mut pending: Option<ClientStreamResponse> = None;

        loop {
            let batch = match batches.next().await {
                Some(Ok(batch)) => batch,
                Some(Err(e)) => {
                    if let Some(p) = pending.take() {
                        yield p;
                    }
                    yield error_snapshot(&acc, status, e);
                    return;
                }
                None => break,
            };

            if let Some(p) = pending.take() {
                yield p;
            }

            let payloads: Result<Vec<IncrementalPayload>, String> = batch
                .iter()
                .map(|part| {
                    serde_json::from_str(part)
                        .map_err(|e| format!("Error in parsing multipart response — {e}"))
                })
                .collect();

            let payloads = match payloads {
                Ok(payloads) => payloads,
                Err(e) => {
                    yield error_snapshot(&acc, status, e);
                    return;
                }
            };

            let batch_errors = acc.merge_batch(payloads);

            if !batch_errors.is_empty() {
                let mut payload =
                    ErrorPayload::with_status(status, format_error_message(
                        "An error occurred while fetching from the API. Review 'graphQLErrors' for details.",
                    ));
                payload = payload.with_graphql_errors(batch_errors);
                yield ClientStreamResponse {
                    data: non_empty_data(&acc),
                    extensions: acc.extensions.clone(),
                    errors: Some(payload),
                    has_next: false,
                };
                return;
            }

            if acc.data_is_empty() && acc.errors.is_empty() {
                yield error_snapshot(&acc, status, "no data or errors".to_string());
                return;
            }

            pending = Some(ClientStreamResponse {
                data: non_empty_data(&acc),
                extensions: acc.extensions.clone(),
                errors: None,
                has_next: acc.has_next,
            });
        }

        if acc.has_next {
            // The held snapshot is superseded by this terminal error rather
            // than also being yielded — S7 produces exactly one snapshot.
            yield error_snapshot(
                &acc,
                status,
                "Response stream terminated unexpectedly".to_string(),
            );
        } else if let Some(p) = pending.take() {
            yield p;
        }
    }
}

fn non_empty_data(acc: &Accumulator) -> Option<Value> {
    if acc.data_is_empty() {
        None
    } else {
        Some(acc.combined_data.clone())
    }
}

fn error_snapshot(acc: &Accumulator, status: u16, message: String) -> ClientStreamResponse {
    ClientStreamResponse {
        data: non_empty_data(acc),
        extensions: acc.extensions.clone(),
        errors: Some(ErrorPayload::with_status(status, format_error_message(message))),
        has_next: false,
    }
}
