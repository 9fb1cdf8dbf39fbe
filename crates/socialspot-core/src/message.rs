// Direct messages between users

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event name used for chat broadcasts
pub const CHAT_EVENT: &str = "message";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Message {
    pub id: i64,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Set once, when the receiver opens the conversation
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }
}

/// Broadcast room shared by both participants of a conversation.
///
/// Independent of who sends: ids are sorted before joining.
pub fn room_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}-{b}")
    } else {
        format!("{b}-{a}")
    }
}

/// Payload pushed to the room when a message is sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatBroadcast {
    #[serde(rename = "type")]
    pub kind: String,
    pub sender_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatBroadcast {
    pub fn new(sender_id: &str, content: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: "chat".to_string(),
            sender_id: sender_id.to_string(),
            content: content.to_string(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_key_is_symmetric() {
        assert_eq!(room_key("bob", "alice"), "alice-bob");
        assert_eq!(room_key("alice", "bob"), "alice-bob");
    }

    #[test]
    fn test_broadcast_shape() {
        let ts = DateTime::parse_from_rfc3339("2024-12-14T15:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let json = serde_json::to_value(ChatBroadcast::new("alice", "hi", ts)).unwrap();
        assert_eq!(json["type"], "chat");
        assert_eq!(json["sender_id"], "alice");
        assert_eq!(json["content"], "hi");
    }
}
