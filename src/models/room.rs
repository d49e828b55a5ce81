use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat session on the omnichannel platform that is tracked until it gets
/// resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    /// The platform's room identifier (`payload.room.id_str` of the webhook).
    pub multichannel_room_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    /// Time elapsed since the room was first stored, clamped at zero.
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.created_at).max(chrono::Duration::zero())
    }
}

/// Input for an upsert.
///
/// Without an `id` the row is keyed by `multichannel_room_id`; with one it is
/// inserted or updated by primary key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveRoom {
    pub id: Option<i64>,
    pub multichannel_room_id: String,
}

impl SaveRoom {
    pub fn new(multichannel_room_id: impl Into<String>) -> Self {
        Self {
            id: None,
            multichannel_room_id: multichannel_room_id.into(),
        }
    }
}

/// Equality filter for deletes. Set columns are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomFilter {
    pub id: Option<i64>,
    pub multichannel_room_id: Option<String>,
}

impl RoomFilter {
    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn by_multichannel_room_id(multichannel_room_id: impl Into<String>) -> Self {
        Self {
            multichannel_room_id: Some(multichannel_room_id.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.multichannel_room_id.is_none()
    }

    /// Whether `room` satisfies every set column.
    pub fn matches(&self, room: &Room) -> bool {
        self.id.is_none_or(|id| room.id == id)
            && self
                .multichannel_room_id
                .as_deref()
                .is_none_or(|mc| room.multichannel_room_id == mc)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn room(id: i64, mc: &str) -> Room {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        Room {
            id,
            multichannel_room_id: mc.to_string(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_filter_matches() {
        let r = room(7, "room-7");
        assert!(RoomFilter::by_id(7).matches(&r));
        assert!(!RoomFilter::by_id(8).matches(&r));
        assert!(RoomFilter::by_multichannel_room_id("room-7").matches(&r));
        assert!(!RoomFilter::by_multichannel_room_id("room-8").matches(&r));

        let both = RoomFilter {
            id: Some(7),
            multichannel_room_id: Some("room-8".into()),
        };
        assert!(!both.matches(&r));
    }

    #[test]
    fn test_empty_filter() {
        assert!(RoomFilter::default().is_empty());
        assert!(!RoomFilter::by_id(1).is_empty());
    }

    #[test]
    fn test_age_never_negative() {
        let r = room(1, "room-1");
        let before = r.created_at - chrono::Duration::minutes(5);
        assert_eq!(r.age_at(before), chrono::Duration::zero());
        let after = r.created_at + chrono::Duration::minutes(11);
        assert_eq!(r.age_at(after), chrono::Duration::minutes(11));
    }
}
