//! Static token authentication for the room API.
//!
//! The `Authorization` header must equal the configured `server.secret_key`
//! exactly. There is no scheme prefix and no per-client key.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::routes::ApiError;

/// Token expected in the `Authorization` header.
#[derive(Clone)]
pub struct StaticToken(Arc<str>);

impl StaticToken {
    pub fn new(token: &str) -> Self {
        Self(Arc::from(token))
    }

    /// Constant-time comparison against a presented header value.
    pub fn matches(&self, presented: &[u8]) -> bool {
        presented.ct_eq(self.0.as_bytes()).into()
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(****)")
    }
}

pub async fn static_token_auth_middleware(
    State(token): State<StaticToken>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorized = req
        .headers()
        .get(AUTHORIZATION)
        .is_some_and(|value| token.matches(value.as_bytes()));

    if !authorized {
        tracing::debug!(path = %req.uri().path(), "Rejected request with invalid static token");
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(req).await)
}
