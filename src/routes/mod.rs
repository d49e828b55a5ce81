mod error;
pub mod health;
mod rooms;
mod webhooks;

use axum::{
    Router,
    routing::{get, post},
};
pub use error::ApiError;

use crate::{AppState, config::ServerConfig, middleware};

/// Webhooks the omnichannel platform delivers to us. Unauthenticated: the
/// platform does not sign them.
pub fn get_webhook_routes() -> Router<AppState> {
    Router::new().route(
        "/qiscus/omnichannel/new-session",
        post(webhooks::new_session),
    )
}

/// Room API, guarded by the static token from `server.secret_key`.
///
/// Returns `None` when no usable token is configured, so the API is never
/// mounted without authentication.
pub fn get_room_routes(config: &ServerConfig) -> Option<Router<AppState>> {
    let token = config
        .secret_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())?;

    Some(
        Router::new()
            .route("/rooms/{id}", get(rooms::get_room))
            .route_layer(axum::middleware::from_fn_with_state(
                middleware::StaticToken::new(token),
                middleware::static_token_auth_middleware,
            )),
    )
}
