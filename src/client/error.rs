use reqwest::{Method, StatusCode};
use thiserror::Error;

/// Raw bodies attached to errors are cut to this many bytes.
pub(crate) const MAX_ERROR_BODY_BYTES: usize = 4 * 1024;

/// Errors returned by [`super::HttpClient`].
///
/// Raw upstream bodies are kept for callers to inspect but never appear in
/// the `Display` output, so errors can be logged without leaking payloads.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request could not be sent or the response could not be read.
    #[error("{method} {url} failed: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The upstream answered with a final (non-retryable) error status.
    #[error("{method} {url} returned error {status}")]
    Upstream {
        method: Method,
        url: String,
        status: StatusCode,
        body: String,
    },

    /// Every attempt failed with a retryable status or transport error.
    #[error("{method} {url} still failing after {attempts} attempts")]
    RetriesExhausted {
        method: Method,
        url: String,
        attempts: u32,
        status: Option<StatusCode>,
        body: Option<String>,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The response was successful but its body is not the expected JSON.
    #[error("unable to decode response body from {url}: {source}")]
    Decode {
        url: String,
        status: StatusCode,
        body: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// Upstream status code, if a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Upstream { status, .. } | ClientError::Decode { status, .. } => {
                Some(*status)
            }
            ClientError::RetriesExhausted { status, .. } => *status,
            ClientError::Build(_) | ClientError::InvalidRequest(_) => None,
            ClientError::Transport { source, .. } => source.status(),
        }
    }

    /// Raw (truncated) response body, if one was received.
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            ClientError::Upstream { body, .. } | ClientError::Decode { body, .. } => Some(body),
            ClientError::RetriesExhausted { body, .. } => body.as_deref(),
            _ => None,
        }
    }

    /// Whether the failure was transient (network trouble or a retryable status).
    ///
    /// Transport errors count only when the underlying failure is one the
    /// client would retry; body read and decode failures do not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport { source, .. } => super::is_retryable_error(source),
            ClientError::RetriesExhausted { .. } => true,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Upstream { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Lossy UTF-8 copy of `body`, cut at a character boundary.
pub(crate) fn truncate_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= MAX_ERROR_BODY_BYTES {
        return text.into_owned();
    }
    let mut end = MAX_ERROR_BODY_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
