//! HTTP plumbing shared by the upstream service clients
//!
//! Every client maps transport failures to `UpstreamFailure::Unreachable` and
//! non-2xx answers to `UpstreamFailure::Status`, so callers only ever see
//! `WanderlensError::Upstream` for a failed call.

use reqwest::{Client, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::Service;
use crate::{Result, WanderlensError};

const USER_AGENT: &str = concat!("Wanderlens/", env!("CARGO_PKG_VERSION"));

/// Plain client, used for multipart requests which cannot be replayed
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| WanderlensError::config(format!("Failed to create HTTP client: {e}")))
}

/// Client for JSON requests, with exponential backoff when `max_retries > 0`
pub fn build_json_client(timeout: Duration, max_retries: u32) -> Result<ClientWithMiddleware> {
    let client = build_client(timeout)?;
    let builder = ClientBuilder::new(client);
    let builder = if max_retries > 0 {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
        builder.with(RetryTransientMiddleware::new_with_policy(retry_policy))
    } else {
        builder
    };
    Ok(builder.build())
}

/// Joins a base URL and a path without doubling slashes
#[must_use]
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub fn transport_error(service: Service, err: &reqwest::Error) -> WanderlensError {
    warn!("{} service unreachable: {}", service, err);
    WanderlensError::upstream_unreachable(service, err.to_string())
}

pub fn middleware_error(service: Service, err: reqwest_middleware::Error) -> WanderlensError {
    match err {
        reqwest_middleware::Error::Reqwest(err) => transport_error(service, &err),
        reqwest_middleware::Error::Middleware(err) => {
            warn!("{} service middleware failure: {:#}", service, err);
            WanderlensError::upstream_unreachable(service, err.to_string())
        }
    }
}

/// Turns a non-2xx response into `UpstreamFailure::Status`
pub async fn ensure_success(service: Service, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!("{} service answered {}", service, status);
    debug!("{} service error body: {}", service, body);
    Err(WanderlensError::upstream_status(service, status.as_u16()))
}

/// Reads a JSON body, mapping a broken body to `Unreachable` and a schema
/// mismatch to `InvalidResponse`.
pub async fn read_json<T: serde::de::DeserializeOwned>(
    service: Service,
    response: Response,
) -> Result<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| transport_error(service, &e))?;
    serde_json::from_slice(&bytes).map_err(|e| {
        warn!("{} service returned an unexpected body: {}", service, e);
        WanderlensError::invalid_response(service, e.to_string())
    })
}
