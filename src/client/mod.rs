//! Outbound HTTP client with bounded retry and uniform error typing.
//!
//! Every call sends and accepts JSON. Transport failures and the configured
//! retryable statuses (429 and 500 by default) are retried with exponential
//! backoff; every other error status is returned immediately. Dropping the
//! returned future cancels the call, including any pending backoff sleep.

mod error;

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use bytes::Bytes;
pub use error::{ClientError, ClientResult};
use error::truncate_body;
use http::{
    HeaderMap, HeaderValue,
    header::{ACCEPT, CONTENT_TYPE},
};
use reqwest::{Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info, warn};

use crate::{
    config::{HttpClientConfig, RetryConfig},
    sanitizer::Sanitizer,
};

/// Determines if a reqwest error is worth another attempt.
///
/// Connection errors, timeouts, and failures while sending are retryable.
pub fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout() || error.is_request()
}

/// A successful (status < 400) response.
#[derive(Debug, Clone)]
pub struct CallResponse {
    pub status: StatusCode,
    pub body: Bytes,
    pub latency: Duration,
}

impl CallResponse {
    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self, url: &str) -> ClientResult<T> {
        serde_json::from_slice(&self.body).map_err(|source| ClientError::Decode {
            url: url.to_string(),
            status: self.status,
            body: truncate_body(&self.body),
            source,
        })
    }
}

/// JSON HTTP client with retry.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    retry: RetryConfig,
    debug: bool,
    sanitizer: Option<Arc<Sanitizer>>,
}

impl HttpClient {
    pub fn new(http: &HttpClientConfig, retry: RetryConfig) -> ClientResult<Self> {
        let client = http.build_client().map_err(ClientError::Build)?;
        Ok(Self::from_client(client, retry))
    }

    pub fn from_client(client: reqwest::Client, retry: RetryConfig) -> Self {
        Self {
            client,
            retry,
            debug: false,
            sanitizer: None,
        }
    }

    /// Log every call at `info` instead of `debug`.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Include request bodies in call logs, redacted by `sanitizer`.
    /// Without a sanitizer bodies are never logged.
    pub fn with_sanitizer(mut self, sanitizer: Arc<Sanitizer>) -> Self {
        self.sanitizer = Some(sanitizer);
        self
    }

    /// Send a request and return the raw successful response.
    ///
    /// `headers` are applied on top of the JSON `Content-Type` and `Accept`
    /// defaults, replacing them when they share a name.
    pub async fn call<B>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        headers: &HeaderMap,
    ) -> ClientResult<CallResponse>
    where
        B: Serialize + ?Sized,
    {
        let body = match body {
            Some(b) => Some(Bytes::from(serde_json::to_vec(b).map_err(|e| {
                ClientError::InvalidRequest(format!("unable to encode request body: {e}"))
            })?)),
            None => None,
        };
        let url = reqwest::Url::parse(url)
            .map_err(|e| ClientError::InvalidRequest(format!("invalid URL '{url}': {e}")))?;

        let mut request_headers = HeaderMap::new();
        request_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        request_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in headers {
            request_headers.insert(name.clone(), value.clone());
        }

        let max_attempts = self.retry.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            let started = Instant::now();
            let outcome = self
                .send_once(&method, &url, &request_headers, body.clone())
                .await;
            let latency = started.elapsed();
            let has_attempts_left = attempt + 1 < max_attempts;

            match outcome {
                Ok((status, response_body)) => {
                    self.log_call(&method, &url, Some(status), latency, attempt, body.as_ref());

                    if !status.is_client_error() && !status.is_server_error() {
                        if attempt > 0 {
                            debug!(
                                method = %method,
                                url = %url,
                                status = %status,
                                attempt = attempt + 1,
                                "Request succeeded after retry"
                            );
                        }
                        return Ok(CallResponse {
                            status,
                            body: response_body,
                            latency,
                        });
                    }

                    if !self.retry.should_retry_status(status.as_u16()) {
                        return Err(ClientError::Upstream {
                            method,
                            url: url.to_string(),
                            status,
                            body: truncate_body(&response_body),
                        });
                    }

                    if !has_attempts_left {
                        warn!(
                            method = %method,
                            url = %url,
                            status = %status,
                            attempts = attempt + 1,
                            "Request failed after all retry attempts"
                        );
                        return Err(ClientError::RetriesExhausted {
                            method,
                            url: url.to_string(),
                            attempts: attempt + 1,
                            status: Some(status),
                            body: Some(truncate_body(&response_body)),
                            source: None,
                        });
                    }

                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        method = %method,
                        url = %url,
                        status = %status,
                        attempt = attempt + 1,
                        max_attempts = max_attempts,
                        delay_ms = delay.as_millis(),
                        "Retryable status code, will retry after delay"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    self.log_call(&method, &url, None, latency, attempt, body.as_ref());

                    if !self.retry.enabled || !is_retryable_error(&error) {
                        return Err(ClientError::Transport {
                            method,
                            url: url.to_string(),
                            source: error,
                        });
                    }

                    if !has_attempts_left {
                        warn!(
                            method = %method,
                            url = %url,
                            error = %error,
                            attempts = attempt + 1,
                            "Request failed after all retry attempts"
                        );
                        return Err(ClientError::RetriesExhausted {
                            method,
                            url: url.to_string(),
                            attempts: attempt + 1,
                            status: None,
                            body: None,
                            source: Some(error),
                        });
                    }

                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        method = %method,
                        url = %url,
                        error = %error,
                        attempt = attempt + 1,
                        max_attempts = max_attempts,
                        delay_ms = delay.as_millis(),
                        "Retryable error, will retry after delay"
                    );
                    tokio::time::sleep(delay).await;
                }
            }

            attempt += 1;
        }
    }

    /// Send a request and decode the successful response body as JSON.
    pub async fn call_json<B, T>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        headers: &HeaderMap,
    ) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(method, url, body, headers).await?.json(url)
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &reqwest::Url,
        headers: &HeaderMap,
        body: Option<Bytes>,
    ) -> Result<(StatusCode, Bytes), reqwest::Error> {
        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .headers(headers.clone());
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok((status, body))
    }

    fn log_call(
        &self,
        method: &Method,
        url: &reqwest::Url,
        status: Option<StatusCode>,
        latency: Duration,
        attempt: u32,
        body: Option<&Bytes>,
    ) {
        let status = status.map(|s| s.as_u16());
        let latency_ms = latency.as_millis() as u64;
        let request_body = match (&self.sanitizer, body) {
            (Some(sanitizer), Some(body)) => Some(sanitizer.sanitize_json(body)),
            _ => None,
        };

        if self.debug {
            info!(
                method = %method,
                url = %url,
                status = ?status,
                latency_ms,
                attempt = attempt + 1,
                request_body = request_body.as_deref(),
                "Outbound request"
            );
        } else {
            debug!(
                method = %method,
                url = %url,
                status = ?status,
                latency_ms,
                attempt = attempt + 1,
                request_body = request_body.as_deref(),
                "Outbound request"
            );
        }
    }
}
