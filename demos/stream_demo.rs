#![deny(clippy::all)]

//! Minimal end-to-end usage of [`Client::request_stream`] against a real
//! `@defer`-capable endpoint, printing each incremental snapshot as it
//! arrives.

use futures::StreamExt;
use graphql_defer_client::config::RequestOptions;
use graphql_defer_client::{Client, ClientConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ClientConfig::from_env()?;
    let client = Client::new(config);

    let operation = "query { shop { id ... @defer { name description } } }";
    tracing::info!("issuing streaming request");
    let mut stream = client.request_stream(operation, RequestOptions::new()).await?;

    while let Some(snapshot) = stream.next().await {
        tracing::info!(
            has_next = snapshot.has_next,
            data = ?snapshot.data,
            "received snapshot"
        );
        if let Some(errors) = snapshot.errors {
            tracing::warn!(message = %errors.message, "stream snapshot carried errors");
        }
    }

    Ok(())
}
