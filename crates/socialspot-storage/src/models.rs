// Database models (internal, may differ from public DTOs)

use chrono::{DateTime, Utc};
use socialspot_core::{CoreError, Event, Match, Message, Profile};
use sqlx::FromRow;

// ============================================
// Auth models (written by the auth provider)
// ============================================

/// User behind a live session
#[derive(Debug, Clone, FromRow)]
pub struct SessionUserRow {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub expires_at: DateTime<Utc>,
}

/// Contact details used for transactional emails
#[derive(Debug, Clone, FromRow)]
pub struct UserContactRow {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
}

// ============================================
// Profile models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub user_id: String,
    pub first_name: String,
    pub age: i32,
    pub interests: String,
    pub instagram_handle: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        // Older rows may hold malformed text; expose them as an empty list
        let interests = serde_json::from_str(&row.interests)
            .unwrap_or_else(|_| serde_json::Value::Array(Vec::new()));
        Profile {
            user_id: row.user_id,
            first_name: row.first_name,
            age: row.age,
            interests,
            instagram_handle: row.instagram_handle,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpsertProfile {
    pub user_id: String,
    pub first_name: String,
    pub age: i32,
    pub interests: String,
    pub instagram_handle: Option<String>,
}

// ============================================
// Event models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub event_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub age: Option<String>,
    pub cost: i64,
    pub max_participants: Option<i32>,
    pub timezone: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub repeating_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            event_id: row.event_id,
            name: row.name,
            description: row.description,
            location: row.location,
            image_url: row.image_url,
            age: row.age,
            cost: row.cost,
            max_participants: row.max_participants,
            timezone: row.timezone,
            start_time: row.start_time,
            end_time: row.end_time,
            repeating_event_id: row.repeating_event_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Flat row produced by the milestone candidate query
#[derive(Debug, Clone, FromRow)]
pub struct ParticipantRecipientRow {
    pub event_id: i64,
    pub event_name: String,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub user_id: String,
    pub email: String,
    pub first_name: String,
}

/// Flat row produced by the unread digest query
#[derive(Debug, Clone, FromRow)]
pub struct MessageDigestRow {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub unique_senders: i64,
    pub sender_names: Vec<String>,
    pub message_ids: Vec<i64>,
}

// ============================================
// Chat models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct MessageRow {
    pub id: i64,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            content: row.content,
            timestamp: row.timestamp,
            read_at: row.read_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateMessage {
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
}

/// Latest message with each conversation partner
#[derive(Debug, Clone, FromRow)]
pub struct RecentChatRow {
    pub user_id: String,
    pub first_name: String,
    pub last_message: String,
    pub timestamp: DateTime<Utc>,
}

// ============================================
// Match models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct MatchRow {
    pub id: i64,
    pub user_id_1: String,
    pub user_id_2: String,
    pub event_id: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub matched_at: Option<DateTime<Utc>>,
}

impl TryFrom<MatchRow> for Match {
    type Error = CoreError;

    fn try_from(row: MatchRow) -> Result<Self, Self::Error> {
        Ok(Match {
            id: row.id,
            user_id_1: row.user_id_1,
            user_id_2: row.user_id_2,
            event_id: row.event_id,
            status: row.status.parse()?,
            created_at: row.created_at,
            matched_at: row.matched_at,
        })
    }
}

// ============================================
// Report models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct ReportRow {
    pub id: i64,
    pub reported_by: String,
    pub reported_user_id: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

// ============================================
// Backup models
// ============================================

/// One column of a table as described by information_schema
#[derive(Debug, Clone, FromRow)]
pub struct ColumnInfoRow {
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: String,
    pub column_default: Option<String>,
}
