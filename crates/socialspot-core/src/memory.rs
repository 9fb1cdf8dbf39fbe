// In-memory implementations for testing
//
// These mirror the SQL semantics of the Postgres store closely enough that
// the job tests exercise the same window and idempotency rules:
// - InMemoryStore: events, participants, users, markers, messages
// - InMemoryJobLockStore: job leases
// - Recording* doubles for the outbound providers

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::email::Email;
use crate::error::{CoreError, Result};
use crate::event::{Event, SeriesMatch};
use crate::message::Message;
use crate::payment::{NewPaymentIntent, PaymentIntent, STATUS_SUCCEEDED};
use crate::traits::{
    BackupSource, Broadcaster, BuildHook, DigestStore, JobLockStore, Mailer, MessageDigest,
    Milestone, MilestoneStore, ObjectStore, ParticipantRecipient, PaymentGateway,
    RecreationStore,
};
use crate::window::{DigestWindow, TimeWindow};

// ============================================================================
// InMemoryStore - Events, participants, users and markers
// ============================================================================

#[derive(Debug, Clone)]
struct UserEntry {
    email: String,
    first_name: Option<String>,
}

#[derive(Debug, Clone)]
struct NotificationEntry {
    user_id: String,
    message_id: i64,
    sent_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoreState {
    events: Vec<Event>,
    participants: Vec<(i64, String)>,
    users: HashMap<String, UserEntry>,
    markers: HashMap<Milestone, HashSet<(i64, String)>>,
    messages: Vec<Message>,
    notifications: Vec<NotificationEntry>,
    failing_insert_names: HashSet<String>,
    failing_marker_users: HashSet<String>,
}

/// In-memory store backing every job store trait
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_event(&self, event: Event) {
        self.state.write().await.events.push(event);
    }

    /// Add a user with an auth record and, optionally, a profile
    pub async fn add_user(&self, user_id: &str, email: &str, first_name: Option<&str>) {
        self.state.write().await.users.insert(
            user_id.to_string(),
            UserEntry {
                email: email.to_string(),
                first_name: first_name.map(String::from),
            },
        );
    }

    pub async fn add_participant(&self, event_id: i64, user_id: &str) {
        self.state
            .write()
            .await
            .participants
            .push((event_id, user_id.to_string()));
    }

    pub async fn add_message(&self, message: Message) {
        self.state.write().await.messages.push(message);
    }

    /// Pre-populate a notification marker (useful for dedup tests)
    pub async fn add_notification(&self, user_id: &str, message_id: i64, sent_at: DateTime<Utc>) {
        self.state.write().await.notifications.push(NotificationEntry {
            user_id: user_id.to_string(),
            message_id,
            sent_at,
        });
    }

    /// Make inserts of events with this name fail
    pub async fn fail_inserts_named(&self, name: &str) {
        self.state
            .write()
            .await
            .failing_insert_names
            .insert(name.to_string());
    }

    /// Make marker writes for this user fail
    pub async fn fail_markers_for(&self, user_id: &str) {
        self.state
            .write()
            .await
            .failing_marker_users
            .insert(user_id.to_string());
    }

    pub async fn events(&self) -> Vec<Event> {
        self.state.read().await.events.clone()
    }

    pub async fn markers(&self, milestone: Milestone) -> HashSet<(i64, String)> {
        self.state
            .read()
            .await
            .markers
            .get(&milestone)
            .cloned()
            .unwrap_or_default()
    }

    /// Message ids that have a notification marker
    pub async fn notified_message_ids(&self) -> Vec<i64> {
        self.state
            .read()
            .await
            .notifications
            .iter()
            .map(|n| n.message_id)
            .collect()
    }
}

#[async_trait]
impl RecreationStore for InMemoryStore {
    async fn expiring_occurrences(
        &self,
        window: &TimeWindow,
        matching: SeriesMatch,
    ) -> Result<Vec<Event>> {
        let state = self.state.read().await;
        Ok(state
            .events
            .iter()
            .filter(|e| e.repeating_event_id.is_some() && window.contains(e.end_time))
            .filter(|e| !state.events.iter().any(|o| matching.is_successor(e, o)))
            .cloned()
            .collect())
    }

    async fn event_id_exists(&self, event_id: i64) -> Result<bool> {
        Ok(self
            .state
            .read()
            .await
            .events
            .iter()
            .any(|e| e.event_id == event_id))
    }

    async fn insert_event(&self, event: &Event) -> Result<()> {
        let mut state = self.state.write().await;
        if state.failing_insert_names.contains(&event.name) {
            return Err(CoreError::store(format!("insert rejected for {}", event.name)));
        }
        if state.events.iter().any(|e| e.event_id == event.event_id) {
            return Err(CoreError::store(format!(
                "duplicate event_id {}",
                event.event_id
            )));
        }
        state.events.push(event.clone());
        Ok(())
    }
}

#[async_trait]
impl MilestoneStore for InMemoryStore {
    async fn pending_recipients(
        &self,
        milestone: Milestone,
        window: &TimeWindow,
        limit: i64,
    ) -> Result<Vec<ParticipantRecipient>> {
        let state = self.state.read().await;
        let sent = state.markers.get(&milestone);
        let mut recipients = Vec::new();

        for event in state
            .events
            .iter()
            .filter(|e| window.contains(milestone.anchor(e)))
        {
            for (_, user_id) in state.participants.iter().filter(|(id, _)| *id == event.event_id) {
                let Some(user) = state.users.get(user_id) else {
                    continue;
                };
                let Some(first_name) = &user.first_name else {
                    continue;
                };
                if sent.is_some_and(|s| s.contains(&(event.event_id, user_id.clone()))) {
                    continue;
                }
                recipients.push(ParticipantRecipient {
                    event_id: event.event_id,
                    event_name: event.name.clone(),
                    location: event.location.clone(),
                    start_time: event.start_time,
                    end_time: event.end_time,
                    user_id: user_id.clone(),
                    email: user.email.clone(),
                    first_name: first_name.clone(),
                });
            }
        }

        recipients.truncate(limit.max(0) as usize);
        Ok(recipients)
    }

    async fn mark_sent(&self, milestone: Milestone, event_id: i64, user_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.failing_marker_users.contains(user_id) {
            return Err(CoreError::store(format!("marker write failed for {user_id}")));
        }
        state
            .markers
            .entry(milestone)
            .or_default()
            .insert((event_id, user_id.to_string()));
        Ok(())
    }
}

#[async_trait]
impl DigestStore for InMemoryStore {
    async fn pending_digests(
        &self,
        window: &DigestWindow,
        limit: i64,
    ) -> Result<Vec<MessageDigest>> {
        let state = self.state.read().await;
        let notified: HashSet<i64> = state.notifications.iter().map(|n| n.message_id).collect();
        let recently_notified: HashSet<&str> = state
            .notifications
            .iter()
            .filter(|n| n.sent_at > window.dedup_since)
            .map(|n| n.user_id.as_str())
            .collect();

        let mut digests: Vec<MessageDigest> = Vec::new();
        for message in state.messages.iter().filter(|m| {
            m.is_unread() && window.covers(m.timestamp) && !notified.contains(&m.id)
        }) {
            if recently_notified.contains(message.receiver_id.as_str()) {
                continue;
            }
            let Some(receiver) = state.users.get(&message.receiver_id) else {
                continue;
            };
            let Some(receiver_name) = &receiver.first_name else {
                continue;
            };
            let Some(sender_name) = state
                .users
                .get(&message.sender_id)
                .and_then(|u| u.first_name.clone())
            else {
                continue;
            };

            let index = match digests.iter().position(|d| d.user_id == message.receiver_id) {
                Some(index) => index,
                None => {
                    digests.push(MessageDigest {
                        user_id: message.receiver_id.clone(),
                        email: receiver.email.clone(),
                        first_name: receiver_name.clone(),
                        unique_senders: 0,
                        sender_names: Vec::new(),
                        message_ids: Vec::new(),
                    });
                    digests.len() - 1
                }
            };
            let digest = &mut digests[index];
            digest.message_ids.push(message.id);
            if !digest.sender_names.contains(&sender_name) {
                digest.sender_names.push(sender_name);
            }
        }

        for digest in digests.iter_mut() {
            let senders: HashSet<&str> = state
                .messages
                .iter()
                .filter(|m| digest.message_ids.contains(&m.id))
                .map(|m| m.sender_id.as_str())
                .collect();
            digest.unique_senders = senders.len() as i64;
        }

        digests.truncate(limit.max(0) as usize);
        Ok(digests)
    }

    async fn mark_notified(&self, user_id: &str, message_ids: &[i64]) -> Result<()> {
        let mut state = self.state.write().await;
        if state.failing_marker_users.contains(user_id) {
            return Err(CoreError::store(format!("marker write failed for {user_id}")));
        }
        let now = Utc::now();
        for id in message_ids {
            state.notifications.push(NotificationEntry {
                user_id: user_id.to_string(),
                message_id: *id,
                sent_at: now,
            });
        }
        Ok(())
    }
}

// ============================================================================
// InMemoryJobLockStore - Job leases
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct InMemoryJobLockStore {
    leases: Arc<RwLock<HashMap<String, (String, DateTime<Utc>)>>>,
}

impl InMemoryJobLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current holder of a job lease, if any
    pub async fn holder(&self, job: &str) -> Option<String> {
        self.leases
            .read()
            .await
            .get(job)
            .map(|(holder, _)| holder.clone())
    }
}

#[async_trait]
impl JobLockStore for InMemoryJobLockStore {
    async fn try_acquire(
        &self,
        job: &str,
        holder: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<bool> {
        let mut leases = self.leases.write().await;
        match leases.get(job) {
            Some((_, until)) if *until > now => Ok(false),
            _ => {
                leases.insert(job.to_string(), (holder.to_string(), now + ttl));
                Ok(true)
            }
        }
    }

    async fn release(&self, job: &str, holder: &str) -> Result<()> {
        let mut leases = self.leases.write().await;
        if leases.get(job).is_some_and(|(h, _)| h == holder) {
            leases.remove(job);
        }
        Ok(())
    }
}

// ============================================================================
// RecordingMailer - Collects emails instead of sending them
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct RecordingMailer {
    sent: Arc<RwLock<Vec<Email>>>,
    failing_recipients: Arc<RwLock<HashSet<String>>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to this address fail
    pub async fn fail_for(&self, email: &str) {
        self.failing_recipients
            .write()
            .await
            .insert(email.to_string());
    }

    pub async fn sent(&self) -> Vec<Email> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        if self.failing_recipients.read().await.contains(&email.to_email) {
            return Err(CoreError::delivery(format!(
                "simulated failure for {}",
                email.to_email
            )));
        }
        self.sent.write().await.push(email.clone());
        Ok(())
    }
}

// ============================================================================
// RecordingBuildHook - Counts rebuild triggers
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct RecordingBuildHook {
    calls: Arc<RwLock<usize>>,
    fail: Arc<RwLock<bool>>,
}

impl RecordingBuildHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            calls: Arc::default(),
            fail: Arc::new(RwLock::new(true)),
        }
    }

    pub async fn calls(&self) -> usize {
        *self.calls.read().await
    }
}

#[async_trait]
impl BuildHook for RecordingBuildHook {
    async fn trigger(&self) -> Result<()> {
        *self.calls.write().await += 1;
        if *self.fail.read().await {
            return Err(CoreError::build_hook("simulated webhook failure"));
        }
        Ok(())
    }
}

// ============================================================================
// RecordingBroadcaster - Collects realtime events
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct RecordingBroadcaster {
    events: Arc<RwLock<Vec<(String, String, serde_json::Value)>>>,
    failures_left: Arc<RwLock<u32>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` triggers
    pub async fn fail_next(&self, count: u32) {
        *self.failures_left.write().await = count;
    }

    pub async fn events(&self) -> Vec<(String, String, serde_json::Value)> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl Broadcaster for RecordingBroadcaster {
    async fn trigger(
        &self,
        channel: &str,
        event: &str,
        payload: &serde_json::Value,
    ) -> Result<()> {
        let mut failures_left = self.failures_left.write().await;
        if *failures_left > 0 {
            *failures_left -= 1;
            return Err(CoreError::broadcast("simulated broadcast failure"));
        }
        self.events
            .write()
            .await
            .push((channel.to_string(), event.to_string(), payload.clone()));
        Ok(())
    }
}

// ============================================================================
// InMemoryObjectStore - Buckets in a HashMap
// ============================================================================

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryObjectStore {
    objects: Arc<RwLock<HashMap<(String, String), StoredObject>>>,
    missing_buckets: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a bucket behave as missing or inaccessible
    pub async fn remove_bucket(&self, bucket: &str) {
        self.missing_buckets.write().await.insert(bucket.to_string());
    }

    pub async fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .read()
            .await
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        self.check_bucket(bucket).await?;
        self.objects.write().await.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String> {
        Ok(format!(
            "memory://{bucket}/{key}?expires={}",
            expires_in.num_seconds()
        ))
    }

    async fn check_bucket(&self, bucket: &str) -> Result<()> {
        if self.missing_buckets.read().await.contains(bucket) {
            return Err(CoreError::object_store(format!("bucket {bucket} not found")));
        }
        Ok(())
    }
}

// ============================================================================
// MockPaymentGateway - Payment intents kept in memory
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct MockPaymentGateway {
    intents: Arc<RwLock<HashMap<String, PaymentIntent>>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an intent as paid
    pub async fn succeed(&self, id: &str) {
        if let Some(intent) = self.intents.write().await.get_mut(id) {
            intent.status = STATUS_SUCCEEDED.to_string();
        }
    }

    pub async fn insert(&self, intent: PaymentIntent) {
        self.intents.write().await.insert(intent.id.clone(), intent);
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_payment_intent(&self, request: &NewPaymentIntent) -> Result<PaymentIntent> {
        let mut intents = self.intents.write().await;
        let id = format!("pi_mock_{}", intents.len() + 1);
        let intent = PaymentIntent {
            id: id.clone(),
            amount: request.amount,
            currency: request.currency.clone(),
            status: "requires_payment_method".to_string(),
            client_secret: Some(format!("{id}_secret")),
            metadata: request.metadata.clone(),
        };
        intents.insert(id, intent.clone());
        Ok(intent)
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent> {
        self.intents
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::payment(format!("No such payment_intent: {id}")))
    }
}

// ============================================================================
// StaticBackupSource - Fixed dump contents
// ============================================================================

#[derive(Debug, Clone)]
pub struct StaticBackupSource {
    dump: Option<String>,
}

impl StaticBackupSource {
    pub fn new(dump: impl Into<String>) -> Self {
        Self {
            dump: Some(dump.into()),
        }
    }

    /// A source whose dump always fails
    pub fn failing() -> Self {
        Self { dump: None }
    }
}

#[async_trait]
impl BackupSource for StaticBackupSource {
    async fn dump_sql(&self) -> Result<String> {
        self.dump
            .clone()
            .ok_or_else(|| CoreError::store("simulated dump failure"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::tests::{at, sample_event};

    #[tokio::test]
    async fn test_expiring_occurrences_respects_window_and_successor() {
        let store = InMemoryStore::new();
        store
            .add_event(sample_event(1, "2024-12-14T07:00:00Z", "2024-12-14T14:00:00Z"))
            .await;
        store
            .add_event(sample_event(2, "2024-12-14T07:00:00Z", "2024-12-14T16:00:00Z"))
            .await;

        let window = TimeWindow::recreation(at("2024-12-14T15:03:00Z"));
        let found = store
            .expiring_occurrences(&window, SeriesMatch::SeriesOnly)
            .await
            .unwrap();
        // event 2 is a later occurrence of the same series, and outside the window
        assert!(found.is_empty());

        let later_window = TimeWindow::recreation(at("2024-12-14T17:03:00Z"));
        let found = store
            .expiring_occurrences(&later_window, SeriesMatch::SeriesOnly)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].event_id, 2);
    }

    #[tokio::test]
    async fn test_job_lock_lease() {
        let locks = InMemoryJobLockStore::new();
        let now = at("2024-12-14T15:00:00Z");
        let ttl = Duration::minutes(10);

        assert!(locks.try_acquire("job", "a", now, ttl).await.unwrap());
        assert!(!locks.try_acquire("job", "b", now, ttl).await.unwrap());

        // expired lease can be taken over
        let later = now + Duration::minutes(11);
        assert!(locks.try_acquire("job", "b", later, ttl).await.unwrap());

        // stale holder cannot release the new lease
        locks.release("job", "a").await.unwrap();
        assert_eq!(locks.holder("job").await.as_deref(), Some("b"));

        locks.release("job", "b").await.unwrap();
        assert_eq!(locks.holder("job").await, None);
    }

    #[tokio::test]
    async fn test_mock_payment_gateway() {
        let gateway = MockPaymentGateway::new();
        let request = NewPaymentIntent::for_booking(5, "u1", 1000);
        let intent = gateway.create_payment_intent(&request).await.unwrap();
        assert_eq!(intent.amount, 1150);

        gateway.succeed(&intent.id).await;
        let fetched = gateway.retrieve_payment_intent(&intent.id).await.unwrap();
        assert_eq!(fetched.status, STATUS_SUCCEEDED);
        assert!(gateway.retrieve_payment_intent("missing").await.is_err());
    }
}
