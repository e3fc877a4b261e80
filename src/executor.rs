//! The retrying HTTP executor.
//!
//! Backoff is fixed and test-overridable rather than exponential or
//! jittered — deliberately simple, not a placeholder.

use std::time::Duration;

use url::Url;

use crate::errors::{format_error_message, ClientError};
use crate::transport::{RawResponse, RequestParams, Transport};

/// Fixed delay between retry attempts. Not exponential, not jittered — see
/// the module docs.
pub const RETRY_WAIT_TIME: Duration = Duration::from_millis(1000);

/// HTTP status codes treated as transient and retried up to the budget.
fn is_retriable_status(status: u16) -> bool {
    matches!(status, 429 | 503)
}

/// Executes one logical request under a bounded retry policy, emitting
/// `tracing` events at the `"HTTP-Retry"` and `"HTTP-Response"` targets.
pub struct Executor {
    transport: std::sync::Arc<dyn Transport>,
}

impl Executor {
    /// Build an executor over the given transport.
    pub fn new(transport: std::sync::Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Run `params` against `url`, retrying transport errors and 429/503
    /// responses up to `max_retries` additional attempts.
    ///
    /// Returns `Ok(response)` for any HTTP response the transport produced —
    /// including a failed response left over after the 429/503 budget was
    /// exhausted ("return the last response object"). Only a transport that
    /// never produced a response at all (every attempt errored) yields `Err`.
    pub async fn execute(
        &self,
        url: &Url,
        params: &RequestParams,
        max_retries: u8,
    ) -> Result<RawResponse, ClientError> {
        let mut attempt: u8 = 0;

        loop {
            match self.transport.send(url, params).await {
                Ok(response) => {
                    if is_retriable_status(response.status.as_u16()) {
                        if attempt < max_retries {
                            tracing::warn!(
                                target: "HTTP-Retry",
                                url = %url,
                                method = params.method,
                                retry_attempt = attempt + 1,
                                max_retries,
                                last_response_status = response.status.as_u16(),
                                "retrying transient HTTP response"
                            );
                            attempt += 1;
                            tokio::time::sleep(RETRY_WAIT_TIME).await;
                            continue;
                        }

                        // Exhausted: return the failed response as-is. No
                        // HTTP-Response event fires here, by design.
                        return Ok(response);
                    }

                    tracing::info!(
                        target: "HTTP-Response",
                        url = %url,
                        method = params.method,
                        status = response.status.as_u16(),
                        "http response"
                    );
                    return Ok(response);
                }
                Err(message) => {
                    if attempt < max_retries {
                        tracing::warn!(
                            target: "HTTP-Retry",
                            url = %url,
                            method = params.method,
                            retry_attempt = attempt + 1,
                            max_retries,
                            "retrying after transport error: {message}"
                        );
                        attempt += 1;
                        tokio::time::sleep(RETRY_WAIT_TIME).await;
                        continue;
                    }

                    if max_retries == 0 {
                        return Err(ClientError::Transport {
                            message: format_error_message(&message),
                        });
                    }

                    return Err(ClientError::NetworkExhausted {
                        max_retries,
                        last_message: message,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{BodyStream, RawResponse};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn params() -> RequestParams {
        RequestParams {
            method: "POST",
            headers: HashMap::new(),
            body: b"{}".to_vec(),
        }
    }

    fn response(status: StatusCode) -> RawResponse {
        RawResponse {
            status,
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            ok: status.is_success(),
            headers: reqwest::header::HeaderMap::new(),
            body: BodyStream::new(futures::stream::empty()),
        }
    }

    struct ScriptedTransport {
        responses: std::sync::Mutex<Vec<Result<StatusCode, String>>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, _url: &Url, _params: &RequestParams) -> Result<RawResponse, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.responses.lock().unwrap().remove(0);
            next.map(response)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_429_then_succeeds() {
        let transport = Arc::new(ScriptedTransport {
            responses: std::sync::Mutex::new(vec![
                Ok(StatusCode::TOO_MANY_REQUESTS),
                Ok(StatusCode::OK),
            ]),
            calls: AtomicUsize::new(0),
        });
        let executor = Executor::new(transport.clone());
        let url = Url::parse("https://example.com/graphql").unwrap();

        let result = executor.execute(&url, &params(), 2).await.unwrap();
        assert_eq!(result.status, StatusCode::OK);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_last_response_on_503_exhaustion_without_erroring() {
        let transport = Arc::new(ScriptedTransport {
            responses: std::sync::Mutex::new(vec![
                Ok(StatusCode::SERVICE_UNAVAILABLE),
                Ok(StatusCode::SERVICE_UNAVAILABLE),
            ]),
            calls: AtomicUsize::new(0),
        });
        let executor = Executor::new(transport.clone());
        let url = Url::parse("https://example.com/graphql").unwrap();

        let result = executor.execute(&url, &params(), 1).await.unwrap();
        assert_eq!(result.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_transport_errors_with_network_exhausted() {
        let transport = Arc::new(ScriptedTransport {
            responses: std::sync::Mutex::new(vec![
                Err("boom1".to_string()),
                Err("boom2".to_string()),
                Err("boom3".to_string()),
            ]),
            calls: AtomicUsize::new(0),
        });
        let executor = Executor::new(transport.clone());
        let url = Url::parse("https://example.com/graphql").unwrap();

        let err = executor.execute(&url, &params(), 2).await.unwrap_err();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
        assert!(err
            .to_string()
            .starts_with("GraphQL Client: Attempted maximum number of 2 network retries. Last message - "));
    }

    #[tokio::test]
    async fn zero_retries_fails_immediately_with_transport_prefix() {
        let transport = Arc::new(ScriptedTransport {
            responses: std::sync::Mutex::new(vec![Err("socket hang up".to_string())]),
            calls: AtomicUsize::new(0),
        });
        let executor = Executor::new(transport.clone());
        let url = Url::parse("https://example.com/graphql").unwrap();

        let err = executor.execute(&url, &params(), 0).await.unwrap_err();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.to_string(), "GraphQL Client: socket hang up");
    }

    #[tokio::test]
    async fn does_not_retry_terminal_statuses() {
        let transport = Arc::new(ScriptedTransport {
            responses: std::sync::Mutex::new(vec![Ok(StatusCode::INTERNAL_SERVER_ERROR)]),
            calls: AtomicUsize::new(0),
        });
        let executor = Executor::new(transport.clone());
        let url = Url::parse("https://example.com/graphql").unwrap();

        let result = executor.execute(&url, &params(), 2).await.unwrap();
        assert_eq!(result.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }
}
