// Connection requests between attendees of the same event

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum MatchStatus {
    Pending,
    Matched,
    Deleted,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::Pending => write!(f, "pending"),
            MatchStatus::Matched => write!(f, "matched"),
            MatchStatus::Deleted => write!(f, "deleted"),
        }
    }
}

impl FromStr for MatchStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MatchStatus::Pending),
            "matched" => Ok(MatchStatus::Matched),
            "deleted" => Ok(MatchStatus::Deleted),
            other => Err(CoreError::store(format!("unknown match status: {other}"))),
        }
    }
}

/// A connection between two users at one event.
/// `user_id_1` is always the user who asked first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: i64,
    pub user_id_1: String,
    pub user_id_2: String,
    pub event_id: i64,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
    pub matched_at: Option<DateTime<Utc>>,
}

/// What a new connection request should do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchDecision {
    /// No connection yet: record a pending request
    CreatePending,
    /// The other user asked first: accept their request (by match id)
    Accept(i64),
    /// Nothing to change
    AlreadyExists,
}

/// Decide how `requester` asking to connect resolves against the existing
/// connection for the same pair and event, looked up in either direction.
pub fn decide(existing: Option<&Match>, requester: &str) -> MatchDecision {
    match existing {
        None => MatchDecision::CreatePending,
        Some(m) if m.user_id_1 != requester && m.status != MatchStatus::Matched => {
            MatchDecision::Accept(m.id)
        }
        Some(_) => MatchDecision::AlreadyExists,
    }
}
