//! End-to-end tests against a real [`ReqwestTransport`] and a mock server,
//! covering the request/response and incremental-delivery scenarios.

use std::time::Duration;

use futures::StreamExt;
use graphql_defer_client::config::RequestOptions;
use graphql_defer_client::{Client, ClientConfig};
use httpmock::prelude::*;
use serde_json::json;
use url::Url;

fn client_for(server: &MockServer, retries: i64) -> Client {
    let config = ClientConfig::builder(Url::parse(&server.base_url()).unwrap())
        .retries(retries)
        .unwrap()
        .build()
        .unwrap();
    Client::new(config)
}

#[tokio::test]
async fn single_json_success_returns_data() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST);
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"data": {"shop": {"name": "Shop 1"}}}));
    });

    let client = client_for(&server, 0);
    let result = client
        .request("query { shop { name } }", RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(result.data, Some(json!({"shop": {"name": "Shop 1"}})));
    assert!(result.errors.is_none());
    mock.assert();
}

#[tokio::test]
async fn exhausts_429_retries_and_returns_last_response_as_error() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST);
        then.status(429).header("content-type", "application/json").body("{}");
    });

    let client = client_for(&server, 1);
    let start = std::time::Instant::now();
    let result = client
        .request("query { shop { name } }", RequestOptions::new())
        .await
        .unwrap();

    // One retry at the fixed 1s interval before the budget is exhausted.
    assert!(start.elapsed() >= Duration::from_millis(900));
    assert_eq!(result.errors.unwrap().network_status_code, Some(429));
    assert_eq!(mock.hits(), 2);
}

#[tokio::test]
async fn non_ok_status_becomes_network_status_code_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST);
        then.status(500).body("Internal Server Error");
    });

    let client = client_for(&server, 0);
    let result = client
        .request("query { shop { name } }", RequestOptions::new())
        .await
        .unwrap();

    let errors = result.errors.unwrap();
    assert_eq!(errors.network_status_code, Some(500));
    assert!(errors.message.starts_with("GraphQL Client: "));
}

#[tokio::test]
async fn graphql_errors_array_is_surfaced() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST);
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "errors": [{"message": "field 'shop' not found"}]
            }));
    });

    let client = client_for(&server, 0);
    let result = client
        .request("query { shop { name } }", RequestOptions::new())
        .await
        .unwrap();

    let errors = result.errors.unwrap();
    assert_eq!(
        errors.graphql_errors.unwrap(),
        vec![json!({"message": "field 'shop' not found"})]
    );
}

#[tokio::test]
async fn request_rejects_defer_operations() {
    let server = MockServer::start();
    let client = client_for(&server, 0);

    let err = client
        .request("query { shop { name } } @defer", RequestOptions::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("streaming entry point"));
}

#[tokio::test]
async fn request_stream_rejects_non_defer_operations() {
    let server = MockServer::start();
    let client = client_for(&server, 0);

    let err = client
        .request_stream("query { shop { name } }", RequestOptions::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("streamable response"));
}

#[tokio::test]
async fn multipart_stream_merges_two_chunks_into_final_snapshot() {
    let server = MockServer::start();
    let body = concat!(
        "--graphql\r\n",
        "Content-Type: application/json\r\n\r\n",
        "{\"data\":{\"shop\":{\"id\":\"gid://shopify/Shop/1\"}},\"hasNext\":true}\r\n",
        "--graphql\r\n",
        "Content-Type: application/json\r\n\r\n",
        "{\"path\":[\"shop\"],\"data\":{\"name\":\"Shop 1\"},\"hasNext\":false}\r\n",
        "--graphql--\r\n",
    );
    server.mock(|when, then| {
        when.method(POST);
        then.status(200)
            .header("content-type", "multipart/mixed; boundary=graphql")
            .body(body);
    });

    let client = client_for(&server, 0);
    let stream = client
        .request_stream(
            "query { shop { name } } @defer",
            RequestOptions::new(),
        )
        .await
        .unwrap();
    let snapshots: Vec<_> = stream.collect().await;

    assert_eq!(snapshots.len(), 2);
    assert!(snapshots[0].has_next);
    assert_eq!(
        snapshots[0].data,
        Some(json!({"shop": {"id": "gid://shopify/Shop/1"}}))
    );
    assert!(!snapshots[1].has_next);
    assert_eq!(
        snapshots[1].data,
        Some(json!({"shop": {"id": "gid://shopify/Shop/1", "name": "Shop 1"}}))
    );
}

#[tokio::test]
async fn multipart_stream_flags_premature_termination() {
    let server = MockServer::start();
    let body = concat!(
        "--graphql\r\n",
        "Content-Type: application/json\r\n\r\n",
        "{\"data\":{\"shop\":{\"id\":\"1\"}},\"hasNext\":true}\r\n",
        "--graphql\r\n",
    );
    server.mock(|when, then| {
        when.method(POST);
        then.status(200)
            .header("content-type", "multipart/mixed; boundary=graphql")
            .body(body);
    });

    let client = client_for(&server, 0);
    let stream = client
        .request_stream("query { shop { name } } @defer", RequestOptions::new())
        .await
        .unwrap();
    let snapshots: Vec<_> = stream.collect().await;

    // Premature termination replaces the partial `{data, hasNext:true}`
    // snapshot rather than appending an error snapshot after it.
    assert_eq!(snapshots.len(), 1);
    let last = &snapshots[0];
    assert!(!last.has_next);
    assert_eq!(last.data, Some(json!({"shop": {"id": "1"}})));
    assert!(last
        .errors
        .as_ref()
        .unwrap()
        .message
        .contains("terminated unexpectedly"));
}

#[tokio::test]
async fn unexpected_content_type_is_reported_as_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST);
        then.status(200).header("content-type", "text/plain").body("nope");
    });

    let client = client_for(&server, 0);
    let result = client
        .request("query { shop { name } }", RequestOptions::new())
        .await
        .unwrap();

    assert!(result
        .errors
        .unwrap()
        .message
        .contains("unexpected Content-Type"));
}
