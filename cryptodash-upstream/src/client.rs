use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, Service, UpstreamError};

pub(crate) fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// POST `body` as JSON and return the JSON answer. Only `200 OK` counts as
/// success; any other status comes back as [`UpstreamError::Status`] with the
/// raw response text.
pub(crate) async fn post_json<B: Serialize + ?Sized>(
    client: &Client,
    service: Service,
    url: &str,
    body: &B,
) -> Result<Value> {
    let response = client.post(url).json(body).send().await.map_err(|e| {
        tracing::error!(service = %service, url, error = %e, "Upstream request failed");
        UpstreamError::Unavailable { service, source: e }
    })?;

    let status = response.status();
    if status != StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(service = %service, status = status.as_u16(), "Upstream returned an error status");
        return Err(UpstreamError::Status {
            service,
            status: status.as_u16(),
            body,
        });
    }

    response.json::<Value>().await.map_err(|e| {
        tracing::error!(service = %service, error = %e, "Upstream returned an unreadable body");
        UpstreamError::Unavailable { service, source: e }
    })
}
