//! Shared HTTP plumbing for the bucket engines.

use crate::error::BackendError;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use std::borrow::Cow;
use std::time::Duration;
use tracing::warn;

pub(crate) const RETRY_ATTEMPTS: u32 = 3;
pub(crate) const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Builds a client that attaches the pre-issued bearer token to every
/// request. The header is marked sensitive so it never shows up in debug
/// output.
pub(crate) fn bearer_client(token: &str) -> Result<Client, BackendError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
        BackendError::Configuration {
            message: "Access token contains characters illegal in an HTTP header".into(),
            context: None,
        }
    })?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);

    Client::builder().default_headers(headers).build().map_err(|err| {
        BackendError::Configuration {
            message: format!("Failed to build HTTP client: {err}").into(),
            context: None,
        }
    })
}

/// Sends `request`, retrying transport failures and 5xx responses with
/// exponential backoff. Any other response is returned as-is for the caller
/// to interpret.
pub(crate) async fn send_with_retry(request: RequestBuilder) -> Result<Response, BackendError> {
    let mut backoff = RETRY_BACKOFF;
    let mut attempt = 1;

    loop {
        let Some(attempt_request) = request.try_clone() else {
            // Streaming bodies cannot be replayed; single shot.
            return Ok(request.send().await?);
        };

        match attempt_request.send().await {
            Ok(response) if response.status().is_server_error() && attempt < RETRY_ATTEMPTS => {
                warn!(attempt, status = %response.status(), "Bucket request failed, retrying");
            },
            Ok(response) => return Ok(response),
            Err(err) if attempt < RETRY_ATTEMPTS => {
                warn!(attempt, error = %err, "Bucket request failed, retrying");
            },
            Err(err) => return Err(err.into()),
        }

        tokio::time::sleep(backoff).await;
        backoff *= 2;
        attempt += 1;
    }
}

/// Maps an unexpected response onto the backend taxonomy: statuses reqwest
/// considers errors become [`BackendError::Unavailable`], anything else is a
/// configuration fault.
pub(crate) fn fail_status(response: Response, what: impl Into<Cow<'static, str>>) -> BackendError {
    let what = what.into();
    match response.error_for_status() {
        Ok(response) => BackendError::Configuration {
            message: format!("Unexpected response status {}", response.status()).into(),
            context: Some(what),
        },
        Err(err) => BackendError::Unavailable { source: err, context: Some(what) },
    }
}
