use serde_json::json;

use crate::error::Result;

/// Client-to-server application messages (STOMP transport only).
///
/// Each variant maps to one `/app/...` destination and serializes to a
/// flat JSON object that always carries `userId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Announce this user after the session opens.
    UserJoin { user_id: String, username: String },

    /// Announce departure before an explicit disconnect.
    UserLeave { user_id: String, username: String },

    ChatMessage {
        user_id: String,
        username: String,
        message: String,
    },

    /// Ask the server to push the current status of a party.
    PartyStatusRequest { party_id: String, user_id: String },

    /// Ask the server to push a notification of the given kind.
    NotificationRequest { user_id: String, kind: String },
}

impl OutboundMessage {
    /// STOMP `SEND` destination.
    pub fn destination(&self) -> &'static str {
        match self {
            OutboundMessage::UserJoin { .. } => "/app/user.join",
            OutboundMessage::UserLeave { .. } => "/app/user.leave",
            OutboundMessage::ChatMessage { .. } => "/app/chat.message",
            OutboundMessage::PartyStatusRequest { .. } => "/app/party.status.request",
            OutboundMessage::NotificationRequest { .. } => "/app/notification.request",
        }
    }

    /// JSON body sent to [`destination`](Self::destination).
    pub fn to_payload(&self) -> Result<String> {
        let value = match self {
            OutboundMessage::UserJoin { user_id, username }
            | OutboundMessage::UserLeave { user_id, username } => json!({
                "userId": user_id,
                "username": username,
            }),
            OutboundMessage::ChatMessage {
                user_id,
                username,
                message,
            } => json!({
                "userId": user_id,
                "username": username,
                "message": message,
            }),
            OutboundMessage::PartyStatusRequest { party_id, user_id } => json!({
                "partyId": party_id,
                "userId": user_id,
            }),
            OutboundMessage::NotificationRequest { user_id, kind } => json!({
                "userId": user_id,
                "type": kind,
            }),
        };
        Ok(serde_json::to_string(&value)?)
    }
}
