use std::sync::Arc;

use thiserror::Error;

use crate::{
    cache::RoomListing,
    client::ClientError,
    db::{DbError, RoomRepo},
    models::{Room, SaveRoom},
    omnichannel::{NewSessionWebhook, Omnichannel},
};

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("room not found")]
    NotFound,

    #[error("invalid webhook payload: {0}")]
    Validation(String),

    #[error("failed to create omnichannel tag: {0}")]
    Omnichannel(#[source] ClientError),

    #[error("failed to {operation} room: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: DbError,
    },
}

/// Ingestion and lookup of tracked rooms.
#[derive(Clone)]
pub struct RoomService {
    repo: Arc<dyn RoomRepo>,
    omnichannel: Arc<dyn Omnichannel>,
    listing: RoomListing,
}

impl RoomService {
    pub fn new(
        repo: Arc<dyn RoomRepo>,
        omnichannel: Arc<dyn Omnichannel>,
        listing: RoomListing,
    ) -> Self {
        Self {
            repo,
            omnichannel,
            listing,
        }
    }

    /// Start tracking the room announced by a new-session webhook.
    ///
    /// The room is tagged with its own id on the platform first; it is only
    /// stored once tagging succeeded. Redelivered webhooks re-tag and keep the
    /// original row.
    pub async fn create_room_from_webhook(
        &self,
        webhook: &NewSessionWebhook,
    ) -> Result<Room, RoomError> {
        let room_id = webhook
            .room_id()
            .ok_or_else(|| RoomError::Validation("payload.room.id_str is required".into()))?;

        self.omnichannel
            .tag_room(room_id, room_id)
            .await
            .map_err(RoomError::Omnichannel)?;

        let room = self
            .repo
            .save(SaveRoom::new(room_id))
            .await
            .map_err(|source| RoomError::Storage {
                operation: "save",
                source,
            })?;

        if let Err(e) = self.listing.invalidate().await {
            tracing::warn!(error = %e, "Failed to invalidate room listing cache");
        }

        tracing::info!(
            room_id = %room.multichannel_room_id,
            id = room.id,
            is_new_session = webhook.is_new_session,
            "Tracking room"
        );
        Ok(room)
    }

    pub async fn get_room_by_id(&self, id: i64) -> Result<Room, RoomError> {
        self.repo.find_by_id(id).await.map_err(|e| match e {
            DbError::NotFound => RoomError::NotFound,
            source => RoomError::Storage {
                operation: "find",
                source,
            },
        })
    }
}
