// Chat service: direct messages with realtime delivery

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use socialspot_core::message::CHAT_EVENT;
use socialspot_core::profile::{profile_picture_key, PROFILE_PICTURE_BUCKET};
use socialspot_core::sanitize::sanitize_optional;
use socialspot_core::{
    room_key, sanitize_input, Broadcaster, ChatBroadcast, Message, ObjectStore, RetryPolicy,
};
use socialspot_storage::{CreateMessage, Database};

use crate::common::ApiError;

/// Most recent conversations shown in the chat sidebar
pub const RECENT_CHATS_LIMIT: i64 = 5;

/// Validity of presigned profile picture links
const PICTURE_URL_TTL: Duration = Duration::hours(1);

/// Latest message exchanged with one chat partner
#[derive(Debug, Clone, PartialEq)]
pub struct RecentChat {
    pub user_id: String,
    pub first_name: String,
    pub last_message: String,
    pub timestamp: DateTime<Utc>,
    pub profile_picture: Option<String>,
}

pub struct ChatService {
    db: Arc<Database>,
    broadcaster: Arc<dyn Broadcaster>,
    objects: Arc<dyn ObjectStore>,
    retry: RetryPolicy,
}

impl ChatService {
    pub fn new(
        db: Arc<Database>,
        broadcaster: Arc<dyn Broadcaster>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            db,
            broadcaster,
            objects,
            // One attempt plus three retries at 1s, 2s and 4s
            retry: RetryPolicy::exponential(4),
        }
    }

    /// Store a message and push it to the conversation room.
    ///
    /// The message is kept even when the broadcast gives up.
    pub async fn send(
        &self,
        sender_id: &str,
        receiver_id: Option<&str>,
        content: Option<&str>,
    ) -> Result<Message, ApiError> {
        let receiver_id = sanitize_optional(receiver_id);
        let content = sanitize_optional(content);
        if receiver_id.is_empty() || content.is_empty() {
            return Err(ApiError::bad_request("Missing required fields"));
        }

        let message: Message = self
            .db
            .create_message(CreateMessage {
                sender_id: sender_id.to_string(),
                receiver_id: receiver_id.clone(),
                content,
            })
            .await
            .map_err(|e| ApiError::internal("Failed to send message", e))?
            .into();

        let payload = ChatBroadcast::new(sender_id, &message.content, message.timestamp);
        let payload = serde_json::to_value(&payload)
            .map_err(|e| ApiError::internal("Failed to send message", e))?;
        let room = room_key(sender_id, &receiver_id);
        if !broadcast_with_retry(self.broadcaster.as_ref(), &self.retry, &room, &payload).await {
            tracing::error!(room = %room, message_id = message.id, "Giving up on chat broadcast");
        }

        Ok(message)
    }

    /// Messages between two users, oldest first. The caller must be one of them.
    pub async fn conversation(
        &self,
        caller: &str,
        sender_id: &str,
        receiver_id: &str,
    ) -> Result<Vec<Message>, ApiError> {
        if caller != sender_id && caller != receiver_id {
            return Err(ApiError::forbidden("Unauthorized access to messages"));
        }

        let rows = self
            .db
            .list_conversation(sender_id, receiver_id)
            .await
            .map_err(|e| ApiError::internal("Failed to fetch messages", e))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let mut message = Message::from(row);
                message.content = sanitize_input(&message.content);
                message
            })
            .collect())
    }

    /// Mark everything `sender_id` sent to the caller as read
    pub async fn mark_read(&self, caller: &str, sender_id: Option<&str>) -> Result<u64, ApiError> {
        let sender_id = sanitize_optional(sender_id);
        if sender_id.is_empty() {
            return Err(ApiError::bad_request("Missing required fields"));
        }

        self.db
            .mark_conversation_read(&sender_id, caller)
            .await
            .map_err(|e| ApiError::internal("Failed to mark messages as read", e))
    }

    pub async fn recent(&self, caller: &str) -> Result<Vec<RecentChat>, ApiError> {
        let rows = self
            .db
            .recent_chats(caller, RECENT_CHATS_LIMIT)
            .await
            .map_err(|e| ApiError::internal("Failed to fetch recent chats", e))?;

        let mut chats = Vec::with_capacity(rows.len());
        for row in rows {
            let profile_picture = self.picture_url(&row.user_id).await;
            chats.push(RecentChat {
                user_id: row.user_id,
                first_name: row.first_name,
                last_message: sanitize_input(&row.last_message),
                timestamp: row.timestamp,
                profile_picture,
            });
        }
        Ok(chats)
    }

    async fn picture_url(&self, user_id: &str) -> Option<String> {
        match self
            .objects
            .presigned_get_url(PROFILE_PICTURE_BUCKET, &profile_picture_key(user_id), PICTURE_URL_TTL)
            .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to presign profile picture");
                None
            }
        }
    }

    /// Number of distinct users with unread messages for the caller
    pub async fn unread_count(&self, caller: &str) -> Result<i64, ApiError> {
        self.db
            .unread_sender_count(caller)
            .await
            .map_err(|e| ApiError::internal("Failed to fetch unread count", e))
    }
}

/// Push `payload` to `room`, retrying with backoff. Returns whether it was delivered.
pub async fn broadcast_with_retry(
    broadcaster: &dyn Broadcaster,
    policy: &RetryPolicy,
    room: &str,
    payload: &serde_json::Value,
) -> bool {
    match policy
        .run(|_| broadcaster.trigger(room, CHAT_EVENT, payload))
        .await
    {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(room, error = %e, "Chat broadcast failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socialspot_core::memory::RecordingBroadcaster;
    use std::time::Duration as StdDuration;

    fn payload() -> serde_json::Value {
        serde_json::json!({"type": "chat", "sender_id": "alice", "content": "hi"})
    }

    #[tokio::test(start_paused = true)]
    async fn test_broadcast_recovers_after_two_failures() {
        let broadcaster = RecordingBroadcaster::new();
        broadcaster.fail_next(2).await;

        let start = tokio::time::Instant::now();
        let delivered = broadcast_with_retry(
            &broadcaster,
            &RetryPolicy::exponential(4),
            "alice-bob",
            &payload(),
        )
        .await;

        assert!(delivered);
        // 1s then 2s of backoff
        assert_eq!(start.elapsed(), StdDuration::from_secs(3));
        let events = broadcaster.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "alice-bob");
        assert_eq!(events[0].1, "message");
    }

    #[tokio::test(start_paused = true)]
    async fn test_broadcast_gives_up_after_three_retries() {
        let broadcaster = RecordingBroadcaster::new();
        broadcaster.fail_next(4).await;

        let start = tokio::time::Instant::now();
        let delivered = broadcast_with_retry(
            &broadcaster,
            &RetryPolicy::exponential(4).with_initial_interval(StdDuration::from_millis(100)),
            "alice-bob",
            &payload(),
        )
        .await;

        assert!(!delivered);
        assert_eq!(start.elapsed(), StdDuration::from_millis(700));
        assert!(broadcaster.events().await.is_empty());
    }
}
