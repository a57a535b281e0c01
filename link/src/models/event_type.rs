use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Kind of realtime event pushed by the party service.
///
/// Serialized as the upper-snake string used on the wire
/// (`"PARTY_UPDATED"`). Values outside the known set parse into
/// [`EventType::Unknown`] instead of failing, so a newer server never
/// breaks an older client; unknown events reach wildcard listeners only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    CharacterUpdated,
    CharacterDeleted,
    PartyCreated,
    PartyUpdated,
    PartyDeleted,
    PartyOptimized,
    RecommendationGenerated,
    UserJoined,
    UserLeft,
    SystemNotification,
    /// A type string this client does not recognize.
    Unknown(String),
}

impl EventType {
    /// Every recognized event type.
    pub const ALL: [EventType; 10] = [
        EventType::CharacterUpdated,
        EventType::CharacterDeleted,
        EventType::PartyCreated,
        EventType::PartyUpdated,
        EventType::PartyDeleted,
        EventType::PartyOptimized,
        EventType::RecommendationGenerated,
        EventType::UserJoined,
        EventType::UserLeft,
        EventType::SystemNotification,
    ];

    /// Wire name of this type.
    pub fn as_str(&self) -> &str {
        match self {
            EventType::CharacterUpdated => "CHARACTER_UPDATED",
            EventType::CharacterDeleted => "CHARACTER_DELETED",
            EventType::PartyCreated => "PARTY_CREATED",
            EventType::PartyUpdated => "PARTY_UPDATED",
            EventType::PartyDeleted => "PARTY_DELETED",
            EventType::PartyOptimized => "PARTY_OPTIMIZED",
            EventType::RecommendationGenerated => "RECOMMENDATION_GENERATED",
            EventType::UserJoined => "USER_JOINED",
            EventType::UserLeft => "USER_LEFT",
            EventType::SystemNotification => "SYSTEM_NOTIFICATION",
            EventType::Unknown(raw) => raw.as_str(),
        }
    }

    /// `false` only for [`EventType::Unknown`].
    pub fn is_recognized(&self) -> bool {
        !matches!(self, EventType::Unknown(_))
    }

    /// Lower-case name the server uses for named SSE frames
    /// (`event: party_updated`).
    pub fn sse_event_name(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl From<&str> for EventType {
    fn from(value: &str) -> Self {
        match value {
            "CHARACTER_UPDATED" => EventType::CharacterUpdated,
            "CHARACTER_DELETED" => EventType::CharacterDeleted,
            "PARTY_CREATED" => EventType::PartyCreated,
            "PARTY_UPDATED" => EventType::PartyUpdated,
            "PARTY_DELETED" => EventType::PartyDeleted,
            "PARTY_OPTIMIZED" => EventType::PartyOptimized,
            "RECOMMENDATION_GENERATED" => EventType::RecommendationGenerated,
            "USER_JOINED" => EventType::UserJoined,
            "USER_LEFT" => EventType::UserLeft,
            "SYSTEM_NOTIFICATION" => EventType::SystemNotification,
            other => EventType::Unknown(other.to_string()),
        }
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        match EventType::from(value.as_str()) {
            EventType::Unknown(_) => EventType::Unknown(value),
            known => known,
        }
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        match value {
            EventType::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for EventType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(EventType::from(s))
    }
}

impl AsRef<str> for EventType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
