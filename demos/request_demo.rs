#![deny(clippy::all)]

//! Minimal end-to-end usage of [`Client::request`] against a real endpoint.
//!
//! Configuration is read the way `ClientConfig::from_env` expects:
//! `GRAPHQL_CLIENT_ENDPOINT` (required), `GRAPHQL_CLIENT_TOKEN` and
//! `GRAPHQL_CLIENT_RETRIES` (optional).

use graphql_defer_client::config::RequestOptions;
use graphql_defer_client::{Client, ClientConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ClientConfig::from_env()?;
    let client = Client::new(config);

    tracing::info!("issuing request");
    let response = client
        .request("query { __typename }", RequestOptions::new())
        .await?;

    match response.errors {
        Some(errors) => tracing::warn!(message = %errors.message, "request returned errors"),
        None => tracing::info!(data = ?response.data, "request succeeded"),
    }

    Ok(())
}
