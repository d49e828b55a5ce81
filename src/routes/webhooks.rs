//! Inbound webhooks from the omnichannel platform.

use axum::{Json, body::Bytes, extract::State};
use http::HeaderMap;
use serde::Serialize;

use super::ApiError;
use crate::{AppState, omnichannel::NewSessionWebhook};

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub message: &'static str,
}

/// Start tracking the room announced by a new-session webhook.
///
/// The body is read raw so that it can be logged (sanitized) even when it
/// does not match the expected shape.
#[tracing::instrument(name = "webhook.new_session", skip_all)]
pub async fn new_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    if tracing::enabled!(tracing::Level::DEBUG) {
        tracing::debug!(
            headers = ?state.sanitizer.sanitize_headers(&headers),
            body = %state.sanitizer.sanitize_json(&body),
            "Received new session webhook"
        );
    }

    let webhook: NewSessionWebhook = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid webhook payload: {e}")))?;

    state
        .rooms
        .create_room_from_webhook(&webhook)
        .await
        .map_err(|e| ApiError::from_room_error(e, &state.sanitizer))?;

    Ok(Json(WebhookAck { message: "ok" }))
}
