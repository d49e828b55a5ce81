use axum::{
    Json,
    extract::{Path, State},
};

use super::ApiError;
use crate::{AppState, models::Room};

/// Look up a tracked room by its local id.
#[tracing::instrument(name = "rooms.get", skip(state))]
pub async fn get_room(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Room>, ApiError> {
    let id: i64 = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid room id '{id}'")))?;

    let room = state
        .rooms
        .get_room_by_id(id)
        .await
        .map_err(|e| ApiError::from_room_error(e, &state.sanitizer))?;

    Ok(Json(room))
}
