// SocialSpot core domain
//
// This crate holds the DB-agnostic part of the backend: domain types, the
// pure calculations behind the scheduled jobs, and the traits that storage
// and SaaS providers implement.
//
// Key design decisions:
// - Uses traits (RecreationStore, MilestoneStore, DigestStore, Mailer, ...) for pluggable backends
// - Every time window is derived from a single "now" passed in by the caller
// - Idempotency lives in the stores' candidate queries, never in the windows
// - Series successor matching is configurable (SeriesMatch)
// - In-memory implementations in `memory` back the job tests

pub mod config;
pub mod email;
pub mod error;
pub mod event;
pub mod matches;
pub mod message;
pub mod palette;
pub mod payment;
pub mod pricing;
pub mod profile;
pub mod report;
pub mod retry;
pub mod sanitize;
pub mod traits;
pub mod window;

// In-memory implementations for testing
pub mod memory;

// Re-exports for convenience
pub use config::SiteConfig;
pub use email::Email;
pub use error::{CoreError, Result};
pub use event::{next_occurrence, Event, SeriesMatch, SeriesRedirect, EVENT_ID_SPACE};
pub use matches::{Match, MatchDecision, MatchStatus};
pub use message::{room_key, ChatBroadcast, Message};
pub use payment::{NewPaymentIntent, PaymentIntent, PaymentMismatch};
pub use profile::{Profile, ProfileFields, ProfileForm};
pub use report::NewReport;
pub use retry::RetryPolicy;
pub use sanitize::sanitize_input;
pub use traits::{
    BackupSource, Broadcaster, BuildHook, DigestStore, JobLockStore, Mailer, MessageDigest,
    Milestone, MilestoneStore, ObjectStore, ParticipantRecipient, PaymentGateway,
    RecreationStore,
};
pub use window::{DigestWindow, TimeWindow};
