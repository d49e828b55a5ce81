//! Inbound webhook payloads sent by the omnichannel platform.

use serde::{Deserialize, Deserializer, Serialize};

/// Body of the "new session" webhook.
///
/// Only `payload.room.id_str` is required; everything else is optional so
/// that platform-side additions don't break ingestion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSessionWebhook {
    #[serde(default)]
    pub is_new_session: bool,

    #[serde(default)]
    pub webhook_type: String,

    pub payload: NewSessionPayload,
}

impl NewSessionWebhook {
    /// The platform's room identifier, if present and non-blank.
    pub fn room_id(&self) -> Option<&str> {
        let id = self.payload.room.id_str.trim();
        (!id.is_empty()).then_some(id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSessionPayload {
    pub room: WebhookRoom,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookRoom {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,

    #[serde(default)]
    pub id_str: String,

    #[serde(default)]
    pub is_public_channel: bool,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub options: Option<String>,

    #[serde(default)]
    pub participants: Vec<Participant>,

    #[serde(default)]
    pub room_avatar: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub topic_id: Option<String>,

    #[serde(default)]
    pub topic_id_str: Option<String>,

    #[serde(default, rename = "type")]
    pub room_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub email: Option<String>,
}

/// Accept ids sent either as JSON strings or numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Num(serde_json::Number),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Str(s) => s,
        Id::Num(n) => n.to_string(),
    }))
}
