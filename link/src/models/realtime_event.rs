//! The unit of inbound realtime information.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::Result;

use super::event_type::EventType;

/// User id reported when the originator has no established identity.
pub const ANONYMOUS_USER_ID: &str = "anonymous";

/// A realtime event as delivered by the party service over SSE or STOMP.
///
/// # Example
///
/// ```rust
/// use party_link::{EventType, RealtimeEvent};
///
/// let event = RealtimeEvent::from_json(
///     r#"{"id":"e1","type":"PARTY_UPDATED","userId":"u1",
///         "timestamp":"2024-05-01T12:00:00","message":"m","broadcast":true}"#,
/// ).unwrap();
/// assert_eq!(event.event_type, EventType::PartyUpdated);
/// assert!(event.data.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeEvent {
    /// Opaque identifier, unique per event instance.
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: EventType,

    /// Affected character or party, when the event concerns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,

    /// Originator of the event; `"anonymous"` when absent.
    #[serde(default = "anonymous", deserialize_with = "deserialize_user_id")]
    pub user_id: String,

    /// Free-form payload interpreted by listeners. `null` reads as empty.
    #[serde(default, deserialize_with = "deserialize_data")]
    pub data: Map<String, JsonValue>,

    /// ISO-8601 creation time as sent by the server.
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: String,

    #[serde(default)]
    pub message: String,

    /// `true` when the event was sent to every connected client.
    #[serde(default)]
    pub broadcast: bool,
}

impl RealtimeEvent {
    /// Create an event with empty data, no target and an anonymous origin.
    pub fn new(id: impl Into<String>, event_type: EventType, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            event_type,
            target_id: None,
            user_id: anonymous(),
            data: Map::new(),
            timestamp: String::new(),
            message: message.into(),
            broadcast: false,
        }
    }

    pub fn with_target_id(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn with_broadcast(mut self, broadcast: bool) -> Self {
        self.broadcast = broadcast;
        self
    }

    /// Parse an event from a transport payload.
    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Serialize to the wire representation.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn anonymous() -> String {
    ANONYMOUS_USER_ID.to_string()
}

fn deserialize_user_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|id| !id.is_empty()).unwrap_or_else(anonymous))
}

fn deserialize_data<'de, D>(deserializer: D) -> std::result::Result<Map<String, JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, JsonValue>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts an ISO string, or the `[year, month, day, hour, minute, second, nanos]`
/// array a JSR-310 serializer emits when it is left in timestamp mode.
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = JsonValue::deserialize(deserializer)?;
    Ok(match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s,
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Array(parts) => {
            let nums: Vec<u64> = parts.iter().filter_map(JsonValue::as_u64).collect();
            if nums.len() != parts.len() || nums.len() < 3 {
                return Err(serde::de::Error::custom("timestamp array must hold at least 3 integers"));
            }
            format_datetime_parts(&nums)
        },
        other => {
            return Err(serde::de::Error::custom(format!("unsupported timestamp value: {}", other)));
        },
    })
}

fn format_datetime_parts(parts: &[u64]) -> String {
    let at = |i: usize| parts.get(i).copied().unwrap_or(0);
    let mut out = format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        at(0),
        at(1),
        at(2),
        at(3),
        at(4),
        at(5)
    );
    if let Some(nanos) = parts.get(6).copied().filter(|n| *n > 0) {
        let fraction = format!("{:09}", nanos.min(999_999_999));
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }
    out
}
