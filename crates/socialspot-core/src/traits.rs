// Core traits for pluggable backends
//
// The scheduled jobs only talk to these traits:
// - Postgres implementations live in socialspot-storage
// - HTTP clients for the SaaS providers live in socialspot-providers
// - In-memory implementations for tests live in `crate::memory`

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::email::Email;
use crate::error::Result;
use crate::event::{Event, SeriesMatch};
use crate::payment::{NewPaymentIntent, PaymentIntent};
use crate::window::{DigestWindow, TimeWindow};

// ============================================================================
// RecreationStore - Candidate selection and insertion for recurring events
// ============================================================================

/// Storage used by the recurring-event recreation job
#[async_trait]
pub trait RecreationStore: Send + Sync {
    /// Occurrences whose `end_time` falls in `window`, that have a series id
    /// and that have no successor under `matching`.
    ///
    /// Inverted time ranges are returned too so the job can report them.
    /// The successor check must be evaluated in the same query as the window.
    async fn expiring_occurrences(
        &self,
        window: &TimeWindow,
        matching: SeriesMatch,
    ) -> Result<Vec<Event>>;

    async fn event_id_exists(&self, event_id: i64) -> Result<bool>;

    async fn insert_event(&self, event: &Event) -> Result<()>;
}

// ============================================================================
// MilestoneStore - Reminder and follow-up candidates with sent markers
// ============================================================================

/// Event lifecycle points that trigger an email to every participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    /// About a day before `start_time`
    Reminder,
    /// About an hour after `end_time`
    Followup,
}

impl Milestone {
    /// Marker table recording sends for this milestone
    pub fn marker_table(&self) -> &'static str {
        match self {
            Milestone::Reminder => "event_reminders",
            Milestone::Followup => "event_followup_sent",
        }
    }

    /// Event column the window is matched against
    pub fn anchor_column(&self) -> &'static str {
        match self {
            Milestone::Reminder => "start_time",
            Milestone::Followup => "end_time",
        }
    }

    /// The anchor instant of an event
    pub fn anchor(&self, event: &Event) -> DateTime<Utc> {
        match self {
            Milestone::Reminder => event.start_time,
            Milestone::Followup => event.end_time,
        }
    }
}

/// One participant of one event that still needs a milestone email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecipient {
    pub event_id: i64,
    pub event_name: String,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub user_id: String,
    pub email: String,
    pub first_name: String,
}

#[async_trait]
pub trait MilestoneStore: Send + Sync {
    /// Participants (with a profile) of events whose anchor falls in
    /// `window`, excluding pairs that already have a marker. At most `limit`.
    async fn pending_recipients(
        &self,
        milestone: Milestone,
        window: &TimeWindow,
        limit: i64,
    ) -> Result<Vec<ParticipantRecipient>>;

    /// Record that the milestone email went out
    async fn mark_sent(&self, milestone: Milestone, event_id: i64, user_id: &str) -> Result<()>;
}

// ============================================================================
// DigestStore - Unread message notifications
// ============================================================================

/// Unread messages grouped for one recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDigest {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub unique_senders: i64,
    pub sender_names: Vec<String>,
    pub message_ids: Vec<i64>,
}

#[async_trait]
pub trait DigestStore: Send + Sync {
    /// Recipients with unread, un-notified messages inside `window`, skipping
    /// anyone notified after `window.dedup_since`. At most `limit` recipients.
    async fn pending_digests(&self, window: &DigestWindow, limit: i64)
        -> Result<Vec<MessageDigest>>;

    /// Record one marker per message included in the digest
    async fn mark_notified(&self, user_id: &str, message_ids: &[i64]) -> Result<()>;
}

// ============================================================================
// JobLockStore - Leased mutual exclusion between overlapping job runs
// ============================================================================

#[async_trait]
pub trait JobLockStore: Send + Sync {
    /// Claim `job` for `holder` until `now + ttl`.
    ///
    /// Succeeds when no lease exists or the existing lease has expired.
    async fn try_acquire(
        &self,
        job: &str,
        holder: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<bool>;

    /// Drop the lease if `holder` still owns it
    async fn release(&self, job: &str, holder: &str) -> Result<()>;
}

// ============================================================================
// BackupSource - SQL dump of the database
// ============================================================================

#[async_trait]
pub trait BackupSource: Send + Sync {
    /// Schema and data of every table as a SQL script
    async fn dump_sql(&self) -> Result<String>;
}

// ============================================================================
// Outbound providers
// ============================================================================

/// Transactional email delivery
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<()>;
}

/// Parameterless webhook that triggers a static site rebuild
#[async_trait]
pub trait BuildHook: Send + Sync {
    async fn trigger(&self) -> Result<()>;
}

/// Realtime pub/sub broadcast to browser clients
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn trigger(&self, channel: &str, event: &str, payload: &serde_json::Value)
        -> Result<()>;
}

/// S3-compatible object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()>;

    /// Time-limited GET URL for a private object
    async fn presigned_get_url(&self, bucket: &str, key: &str, expires_in: Duration)
        -> Result<String>;

    /// Fails when the bucket is missing or not accessible
    async fn check_bucket(&self, bucket: &str) -> Result<()>;
}

/// Card payments
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(&self, request: &NewPaymentIntent) -> Result<PaymentIntent>;

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent>;
}
