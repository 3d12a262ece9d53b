//! Shared HTTP transport for IBM Cloud API clients
//!
//! Applies bearer authentication, the configured timeout and the
//! configuration-supplied retry policy. Retries happen here and only here.
//!
//! Idempotent requests are retried on 429, 5xx, connect errors and timeouts.
//! A `POST` or `PATCH` may already have taken effect when the server fails or
//! the response is lost, so those are retried only on 429 and connect errors.

use crate::error::{ApiError, SessionError};
use reqwest::header::ACCEPT;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use vpcflow_cloud::RetryPolicy;

pub(crate) const USER_AGENT: &str = concat!("vpcflow/", env!("CARGO_PKG_VERSION"));

/// Client builder with the user agent and, unless it is zero, the timeout
pub(crate) fn client_builder(timeout: Duration) -> ClientBuilder {
    let builder = Client::builder().user_agent(USER_AGENT);
    if timeout.is_zero() {
        builder
    } else {
        builder.timeout(timeout)
    }
}

/// Connection settings for one API client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Service base URL
    pub url: String,

    /// Bearer token without the `Bearer ` prefix
    pub bearer_token: SecretString,

    /// Zero disables the timeout
    pub timeout: Duration,

    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub(crate) struct ApiTransport {
    client: Client,
    base_url: String,
    bearer_token: SecretString,
    retry: RetryPolicy,
}

impl ApiTransport {
    pub(crate) fn new(service: &'static str, options: ClientOptions) -> Result<Self, SessionError> {
        let construction_failed = |message: String| SessionError::ClientConstructionFailed {
            service,
            message,
        };

        let url = reqwest::Url::parse(&options.url)
            .map_err(|e| construction_failed(format!("invalid URL {:?}: {}", options.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(construction_failed(format!(
                "invalid URL {:?}: expected an http(s) URL with a host",
                options.url
            )));
        }

        let client = client_builder(options.timeout)
            .build()
            .map_err(|e| construction_failed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: options.url.trim_end_matches('/').to_string(),
            bearer_token: options.bearer_token,
            retry: options.retry,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request built by `build`, retrying transient failures
    ///
    /// `build` is called once per attempt. Any non-2xx response that is not
    /// retried is turned into [`ApiError::Status`].
    pub(crate) async fn send<F>(&self, build: F) -> Result<Response, ApiError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let attempts = self.retry.attempts();
        let mut attempt = 1;
        loop {
            let request = build(&self.client)
                .bearer_auth(self.bearer_token.expose_secret())
                .header(ACCEPT, "application/json")
                .build()?;
            let idempotent = request.method().is_idempotent();

            match self.client.execute(request).await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    if is_retryable(status, idempotent) && attempt < attempts {
                        tracing::warn!(
                            "Request to {} returned {}, retrying ({}/{})",
                            response.url(),
                            status,
                            attempt,
                            attempts - 1
                        );
                    } else {
                        return Err(status_error(response).await);
                    }
                }
                Err(e) => {
                    let transient = e.is_connect() || (idempotent && e.is_timeout());
                    if transient && attempt < attempts {
                        tracing::warn!("Request failed: {}, retrying ({}/{})", e, attempt, attempts - 1);
                    } else {
                        return Err(ApiError::Http(e));
                    }
                }
            }

            attempt += 1;
            tokio::time::sleep(self.retry.delay).await;
        }
    }

    /// Send and decode a JSON response body
    pub(crate) async fn json<T, F>(&self, build: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = self.send(build).await?;
        Ok(response.json().await?)
    }
}

fn is_retryable(status: StatusCode, idempotent: bool) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || (idempotent && status.is_server_error())
}

async fn status_error(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.unwrap_or_default();
    ApiError::Status {
        status,
        body,
        request_id,
    }
}
