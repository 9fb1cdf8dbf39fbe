// Job pipeline tests against the in-memory backends

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use socialspot_core::memory::{
    InMemoryJobLockStore, InMemoryObjectStore, InMemoryStore, RecordingBuildHook,
    RecordingMailer, StaticBackupSource,
};
use socialspot_core::{Event, JobLockStore, Message, Milestone, SeriesMatch};
use socialspot_worker::jobs::{BACKUP_BUCKET, BACKUP_CONTENT_TYPE};
use socialspot_worker::{JobDependencies, JobKind, JobResponse, Jobs, WorkerConfig};

fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

fn occurrence(
    id: i64,
    name: &str,
    series: Option<&str>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Event {
    Event {
        event_id: id,
        name: name.to_string(),
        description: Some("Weekly meetup".to_string()),
        location: Some("The Spot".to_string()),
        image_url: None,
        age: Some("21-35".to_string()),
        cost: 1500,
        max_participants: Some(20),
        timezone: Some("America/New_York".to_string()),
        start_time: start,
        end_time: end,
        repeating_event_id: series.map(String::from),
        created_at: start - Duration::days(30),
        updated_at: start - Duration::days(30),
    }
}

struct Harness {
    store: Arc<InMemoryStore>,
    locks: Arc<InMemoryJobLockStore>,
    mailer: Arc<RecordingMailer>,
    build_hook: Arc<RecordingBuildHook>,
    objects: Arc<InMemoryObjectStore>,
    jobs: Jobs,
}

impl Harness {
    fn new() -> Self {
        Self::with(WorkerConfig::default(), StaticBackupSource::new("-- dump\n"))
    }

    fn with(config: WorkerConfig, backups: StaticBackupSource) -> Self {
        Self::build(config, backups, RecordingBuildHook::new())
    }

    fn build(
        config: WorkerConfig,
        backups: StaticBackupSource,
        build_hook: RecordingBuildHook,
    ) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let locks = Arc::new(InMemoryJobLockStore::new());
        let mailer = Arc::new(RecordingMailer::new());
        let build_hook = Arc::new(build_hook);
        let objects = Arc::new(InMemoryObjectStore::new());
        let jobs = Jobs::new(
            JobDependencies {
                recreation: store.clone(),
                milestones: store.clone(),
                digests: store.clone(),
                locks: locks.clone(),
                backups: Arc::new(backups),
                mailer: mailer.clone(),
                build_hook: build_hook.clone(),
                objects: objects.clone(),
            },
            config,
        );
        Self {
            store,
            locks,
            mailer,
            build_hook,
            objects,
            jobs,
        }
    }
}

fn body(response: &JobResponse) -> Value {
    serde_json::to_value(response).unwrap()
}

// ============================================================================
// recreate-events
// ============================================================================

#[tokio::test]
async fn test_recreates_weekly_occurrence_end_to_end() {
    let h = Harness::new();
    h.store
        .add_event(occurrence(
            42,
            "Saturday Brunch",
            Some("R"),
            at("2024-12-14T07:00:00Z"),
            at("2024-12-14T14:00:00Z"),
        ))
        .await;

    let response = h
        .jobs
        .run(JobKind::RecreateEvents, at("2024-12-14T15:03:00Z"))
        .await;

    let json = body(&response);
    assert_eq!(response.http_status(), 200);
    assert_eq!(json["success"], true);
    assert_eq!(json["processed"], 1);
    assert_eq!(json["results"][0]["success"], true);
    assert_eq!(json["results"][0]["originalEventId"], 42);
    assert_eq!(json["timeRange"]["startTime"], "2024-12-14T14:00:00Z");
    assert_eq!(json["timeRange"]["endTime"], "2024-12-14T15:00:00Z");

    let new_id = json["results"][0]["newEventId"].as_i64().unwrap();
    let created = h
        .store
        .events()
        .await
        .into_iter()
        .find(|e| e.event_id == new_id)
        .expect("new occurrence stored");
    assert_eq!(created.start_time, at("2024-12-21T07:00:00Z"));
    assert_eq!(created.end_time, at("2024-12-21T14:00:00Z"));
    assert_eq!(created.name, "Saturday Brunch");
    assert_eq!(created.repeating_event_id.as_deref(), Some("R"));
    assert_eq!(created.cost, 1500);
    assert_eq!(created.created_at, at("2024-12-14T15:03:00Z"));
    assert_eq!(h.build_hook.calls().await, 1);
}

#[tokio::test]
async fn test_window_excludes_occurrences_outside_previous_hour() {
    let h = Harness::new();
    // Ends exactly at the exclusive upper bound
    h.store
        .add_event(occurrence(
            1,
            "Late",
            Some("A"),
            at("2024-12-14T13:00:00Z"),
            at("2024-12-14T15:00:00Z"),
        ))
        .await;
    // Ended before the window
    h.store
        .add_event(occurrence(
            2,
            "Early",
            Some("B"),
            at("2024-12-14T11:00:00Z"),
            at("2024-12-14T13:59:59Z"),
        ))
        .await;
    // Not part of a series
    h.store
        .add_event(occurrence(
            3,
            "One-off",
            None,
            at("2024-12-14T12:00:00Z"),
            at("2024-12-14T14:30:00Z"),
        ))
        .await;

    let response = h
        .jobs
        .run(JobKind::RecreateEvents, at("2024-12-14T15:03:00Z"))
        .await;

    let json = body(&response);
    assert_eq!(json["message"], "No events to recreate");
    assert_eq!(json["timeRange"]["startTime"], "2024-12-14T14:00:00Z");
    assert_eq!(h.store.events().await.len(), 3);
    assert_eq!(h.build_hook.calls().await, 0);
}

#[tokio::test]
async fn test_second_run_creates_nothing() {
    let h = Harness::new();
    h.store
        .add_event(occurrence(
            7,
            "Trivia",
            Some("T"),
            at("2024-12-14T12:00:00Z"),
            at("2024-12-14T14:30:00Z"),
        ))
        .await;
    let now = at("2024-12-14T15:10:00Z");

    let first = h.jobs.run(JobKind::RecreateEvents, now).await;
    assert_eq!(body(&first)["processed"], 1);

    let second = h.jobs.run(JobKind::RecreateEvents, now + Duration::minutes(5)).await;
    assert_eq!(body(&second)["message"], "No events to recreate");
    assert_eq!(h.store.events().await.len(), 2);
}

#[tokio::test]
async fn test_renamed_successor_does_not_block_recreation_by_default() {
    let h = Harness::new();
    h.store
        .add_event(occurrence(
            1,
            "Trivia",
            Some("T"),
            at("2024-12-14T12:00:00Z"),
            at("2024-12-14T14:30:00Z"),
        ))
        .await;
    h.store
        .add_event(occurrence(
            2,
            "Trivia Night",
            Some("T"),
            at("2024-12-21T12:00:00Z"),
            at("2024-12-21T14:30:00Z"),
        ))
        .await;

    let response = h
        .jobs
        .run(JobKind::RecreateEvents, at("2024-12-14T15:10:00Z"))
        .await;

    assert_eq!(body(&response)["processed"], 1);
}

#[tokio::test]
async fn test_renamed_successor_blocks_recreation_in_series_only_mode() {
    let h = Harness::with(
        WorkerConfig {
            series_match: SeriesMatch::SeriesOnly,
            ..WorkerConfig::default()
        },
        StaticBackupSource::new("-- dump\n"),
    );
    h.store
        .add_event(occurrence(
            1,
            "Trivia",
            Some("T"),
            at("2024-12-14T12:00:00Z"),
            at("2024-12-14T14:30:00Z"),
        ))
        .await;
    h.store
        .add_event(occurrence(
            2,
            "Trivia Night",
            Some("T"),
            at("2024-12-21T12:00:00Z"),
            at("2024-12-21T14:30:00Z"),
        ))
        .await;

    let response = h
        .jobs
        .run(JobKind::RecreateEvents, at("2024-12-14T15:10:00Z"))
        .await;

    assert_eq!(body(&response)["message"], "No events to recreate");
    assert_eq!(h.store.events().await.len(), 2);
}

#[tokio::test]
async fn test_recreation_preserves_duration() {
    let h = Harness::new();
    let start = at("2024-12-14T11:15:00Z");
    let end = start + Duration::minutes(165);
    h.store
        .add_event(occurrence(5, "Board games", Some("G"), start, end))
        .await;

    h.jobs
        .run(JobKind::RecreateEvents, at("2024-12-14T15:00:00Z"))
        .await;

    let created = h
        .store
        .events()
        .await
        .into_iter()
        .find(|e| e.event_id != 5)
        .unwrap();
    assert_eq!(created.end_time, end + Duration::days(7));
    assert_eq!(created.end_time - created.start_time, Duration::minutes(165));
}

#[tokio::test]
async fn test_inverted_occurrence_reports_invalid_time_sequence() {
    let h = Harness::new();
    h.store
        .add_event(occurrence(
            9,
            "Broken",
            Some("X"),
            at("2024-12-14T16:00:00Z"),
            at("2024-12-14T14:30:00Z"),
        ))
        .await;

    let response = h
        .jobs
        .run(JobKind::RecreateEvents, at("2024-12-14T15:10:00Z"))
        .await;

    let json = body(&response);
    assert_eq!(response.http_status(), 200);
    assert_eq!(json["results"][0]["success"], false);
    assert_eq!(json["results"][0]["error"], "Invalid time sequence");
    assert_eq!(h.store.events().await.len(), 1);
    assert_eq!(h.build_hook.calls().await, 0);
}

#[tokio::test]
async fn test_new_ids_are_unique_in_small_space() {
    let config = WorkerConfig {
        event_id_space: 8,
        id_allocation_max_attempts: 500,
        ..WorkerConfig::default()
    };
    let h = Harness::with(config, StaticBackupSource::new(""));
    for (id, series) in [(0, "A"), (1, "B"), (2, "C"), (3, "D")] {
        h.store
            .add_event(occurrence(
                id,
                series,
                Some(series),
                at("2024-12-14T12:00:00Z"),
                at("2024-12-14T14:30:00Z"),
            ))
            .await;
    }

    let response = h
        .jobs
        .run(JobKind::RecreateEvents, at("2024-12-14T15:10:00Z"))
        .await;

    assert_eq!(body(&response)["processed"], 4);
    let ids: Vec<i64> = h.store.events().await.iter().map(|e| e.event_id).collect();
    let unique: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(ids.len(), 8);
    assert_eq!(unique.len(), 8);
    assert!(ids.iter().all(|id| (0..8).contains(id)));
}

#[tokio::test]
async fn test_failed_insert_does_not_stop_other_items() {
    let h = Harness::new();
    for (id, name) in [(10, "Alpha"), (20, "Bravo"), (30, "Charlie")] {
        h.store
            .add_event(occurrence(
                id,
                name,
                Some(name),
                at("2024-12-14T12:00:00Z"),
                at("2024-12-14T14:30:00Z"),
            ))
            .await;
    }
    h.store.fail_inserts_named("Bravo").await;

    let response = h
        .jobs
        .run(JobKind::RecreateEvents, at("2024-12-14T15:10:00Z"))
        .await;

    let json = body(&response);
    assert_eq!(json["processed"], 3);
    let results = json["results"].as_array().unwrap();
    let failed: Vec<i64> = results
        .iter()
        .filter(|r| r["success"] == false)
        .map(|r| r["originalEventId"].as_i64().unwrap())
        .collect();
    assert_eq!(failed, vec![20]);
    assert_eq!(h.store.events().await.len(), 5);
    assert_eq!(h.build_hook.calls().await, 1);
}

#[tokio::test]
async fn test_build_hook_failure_does_not_fail_run() {
    let h = Harness::build(
        WorkerConfig::default(),
        StaticBackupSource::new(""),
        RecordingBuildHook::failing(),
    );
    h.store
        .add_event(occurrence(
            1,
            "Trivia",
            Some("T"),
            at("2024-12-14T12:00:00Z"),
            at("2024-12-14T14:30:00Z"),
        ))
        .await;

    let response = h
        .jobs
        .run(JobKind::RecreateEvents, at("2024-12-14T15:10:00Z"))
        .await;

    assert_eq!(response.http_status(), 200);
    assert_eq!(body(&response)["results"][0]["success"], true);
    assert_eq!(h.build_hook.calls().await, 1);
}

#[tokio::test]
async fn test_held_lease_skips_run() {
    let h = Harness::new();
    let now = at("2024-12-14T15:10:00Z");
    assert!(h
        .locks
        .try_acquire("recreate-events", "other-replica", now, Duration::minutes(15))
        .await
        .unwrap());
    h.store
        .add_event(occurrence(
            1,
            "Trivia",
            Some("T"),
            at("2024-12-14T12:00:00Z"),
            at("2024-12-14T14:30:00Z"),
        ))
        .await;

    let response = h.jobs.run(JobKind::RecreateEvents, now).await;

    assert_eq!(response.http_status(), 200);
    assert_eq!(body(&response)["message"], "Job already running");
    assert_eq!(h.store.events().await.len(), 1);
    assert_eq!(
        h.locks.holder("recreate-events").await.as_deref(),
        Some("other-replica")
    );
}

#[tokio::test]
async fn test_lease_is_released_after_run() {
    let h = Harness::new();

    h.jobs
        .run(JobKind::SendEventReminder, at("2024-12-14T15:10:00Z"))
        .await;

    assert!(h.locks.holder("send-event-reminder").await.is_none());
}

// ============================================================================
// send-event-reminder / send-event-followup
// ============================================================================

async fn seed_attendees(h: &Harness, event: Event) {
    let id = event.event_id;
    h.store.add_event(event).await;
    h.store.add_user("u1", "ana@example.com", Some("Ana")).await;
    h.store.add_user("u2", "ben@example.com", Some("Ben")).await;
    h.store.add_user("u3", "noprofile@example.com", None).await;
    for user in ["u1", "u2", "u3"] {
        h.store.add_participant(id, user).await;
    }
}

#[tokio::test]
async fn test_reminders_go_out_once_per_attendee() {
    let h = Harness::new();
    let now = at("2024-12-13T09:00:00Z");
    seed_attendees(
        &h,
        occurrence(
            77,
            "Salsa Night",
            None,
            now + Duration::hours(24),
            now + Duration::hours(27),
        ),
    )
    .await;

    let response = h.jobs.run(JobKind::SendEventReminder, now).await;

    let json = body(&response);
    assert_eq!(json["processed"], 2);
    assert_eq!(json["results"][0]["event_id"], 77);
    let sent = h.mailer.sent().await;
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|e| e.subject.contains("Salsa Night")));
    assert!(!sent.iter().any(|e| e.to_email == "noprofile@example.com"));
    assert_eq!(h.store.markers(Milestone::Reminder).await.len(), 2);

    let again = h
        .jobs
        .run(JobKind::SendEventReminder, now + Duration::minutes(30))
        .await;
    assert_eq!(body(&again)["message"], "No reminders to send");
    assert_eq!(h.mailer.sent().await.len(), 2);
}

#[tokio::test]
async fn test_marker_write_failure_reports_error_and_resends() {
    let h = Harness::new();
    let now = at("2024-12-13T09:00:00Z");
    seed_attendees(
        &h,
        occurrence(
            79,
            "Board Games",
            None,
            now + Duration::hours(24),
            now + Duration::hours(26),
        ),
    )
    .await;
    h.store.fail_markers_for("u1").await;

    let response = h.jobs.run(JobKind::SendEventReminder, now).await;

    assert_eq!(response.http_status(), 200);
    let json = body(&response);
    assert_eq!(json["processed"], 2);
    let u1 = json["results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["user_id"] == "u1")
        .unwrap();
    assert_eq!(u1["success"], false);
    assert!(u1["error"].as_str().unwrap().contains("marker write failed"));
    // Delivered even though the marker was not recorded
    assert_eq!(h.mailer.sent().await.len(), 2);
    assert_eq!(
        h.store.markers(Milestone::Reminder).await,
        HashSet::from([(79, "u2".to_string())])
    );

    let again = h
        .jobs
        .run(JobKind::SendEventReminder, now + Duration::minutes(30))
        .await;
    let json = body(&again);
    assert_eq!(json["processed"], 1);
    assert_eq!(json["results"][0]["user_id"], "u1");
    let to_ana = h
        .mailer
        .sent()
        .await
        .iter()
        .filter(|e| e.to_email == "ana@example.com")
        .count();
    assert_eq!(to_ana, 2);
}

#[tokio::test]
async fn test_batch_limit_defers_overflow_to_next_run() {
    let h = Harness::with(
        WorkerConfig {
            batch_limit: 2,
            ..WorkerConfig::default()
        },
        StaticBackupSource::new(""),
    );
    let now = at("2024-12-13T09:00:00Z");
    seed_attendees(
        &h,
        occurrence(
            80,
            "Book Club",
            None,
            now + Duration::hours(24),
            now + Duration::hours(26),
        ),
    )
    .await;
    h.store.add_user("u4", "cleo@example.com", Some("Cleo")).await;
    h.store.add_participant(80, "u4").await;

    let first = h.jobs.run(JobKind::SendEventReminder, now).await;
    assert_eq!(body(&first)["processed"], 2);
    assert_eq!(h.mailer.sent().await.len(), 2);

    let second = h
        .jobs
        .run(JobKind::SendEventReminder, now + Duration::minutes(5))
        .await;
    let json = body(&second);
    assert_eq!(json["processed"], 1);
    assert_eq!(json["results"][0]["user_id"], "u4");
    assert_eq!(h.store.markers(Milestone::Reminder).await.len(), 3);

    let third = h
        .jobs
        .run(JobKind::SendEventReminder, now + Duration::minutes(10))
        .await;
    assert_eq!(body(&third)["message"], "No reminders to send");
}

#[tokio::test]
async fn test_failed_delivery_leaves_no_marker_and_retries() {
    let h = Harness::new();
    let now = at("2024-12-14T16:00:00Z");
    seed_attendees(
        &h,
        occurrence(
            78,
            "Pub Quiz",
            None,
            now - Duration::hours(3),
            now - Duration::minutes(60),
        ),
    )
    .await;
    h.mailer.fail_for("ben@example.com").await;

    let response = h.jobs.run(JobKind::SendEventFollowup, now).await;

    let json = body(&response);
    assert_eq!(json["processed"], 2);
    let failed: Vec<&Value> = json["results"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r["success"] == false)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["user_id"], "u2");
    assert_eq!(
        h.store.markers(Milestone::Followup).await,
        HashSet::from([(78, "u1".to_string())])
    );

    let retry = h
        .jobs
        .run(JobKind::SendEventFollowup, now + Duration::minutes(2))
        .await;
    let json = body(&retry);
    assert_eq!(json["processed"], 1);
    assert_eq!(json["results"][0]["user_id"], "u2");
}

#[tokio::test]
async fn test_followup_with_nobody_pending() {
    let h = Harness::new();

    let response = h
        .jobs
        .run(JobKind::SendEventFollowup, at("2024-12-14T16:00:00Z"))
        .await;

    let json = body(&response);
    assert_eq!(json["message"], "No emails to send");
    assert_eq!(json["timeRange"]["startTime"], "2024-12-14T14:55:00Z");
    assert_eq!(json["timeRange"]["endTime"], "2024-12-14T16:05:00Z");
}

// ============================================================================
// send-message-notifications
// ============================================================================

fn message(id: i64, from: &str, to: &str, timestamp: DateTime<Utc>) -> Message {
    Message {
        id,
        sender_id: from.to_string(),
        receiver_id: to.to_string(),
        content: "hey!".to_string(),
        timestamp,
        read_at: None,
    }
}

#[tokio::test]
async fn test_digest_covers_settled_unread_messages_once() {
    let h = Harness::new();
    let now = Utc::now();
    h.store.add_user("r", "rita@example.com", Some("Rita")).await;
    h.store.add_user("s1", "sam@example.com", Some("Sam")).await;
    h.store.add_user("s2", "tom@example.com", Some("Tom")).await;
    h.store.add_message(message(1, "s1", "r", now - Duration::hours(2))).await;
    h.store.add_message(message(2, "s2", "r", now - Duration::hours(1))).await;
    // Too fresh, left for the in-app view
    h.store.add_message(message(3, "s1", "r", now - Duration::minutes(5))).await;

    let response = h.jobs.run(JobKind::SendMessageNotifications, now).await;

    let json = body(&response);
    assert_eq!(json["processed"], 1);
    assert!(json.get("timeRange").is_none());
    let sent = h.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to_email, "rita@example.com");
    assert!(sent[0].html.contains("Sam"));
    assert!(sent[0].html.contains("Tom"));
    let mut notified = h.store.notified_message_ids().await;
    notified.sort();
    assert_eq!(notified, vec![1, 2]);

    let again = h
        .jobs
        .run(JobKind::SendMessageNotifications, now + Duration::minutes(30))
        .await;
    assert_eq!(body(&again)["message"], "No notifications to send");
}

// ============================================================================
// backup-database
// ============================================================================

#[tokio::test]
async fn test_backup_uploads_dump() {
    let h = Harness::with(
        WorkerConfig::default(),
        StaticBackupSource::new("CREATE TABLE \"events\" ();\n"),
    );

    let response = h
        .jobs
        .run(JobKind::BackupDatabase, at("2024-12-14T03:00:00Z"))
        .await;

    let json = body(&response);
    assert_eq!(json["message"], "Database backup completed successfully");
    assert_eq!(json["file"], "backup-dev-2024-12-14T03-00-00-000Z.sql");
    let stored = h
        .objects
        .get(BACKUP_BUCKET, "backup-dev-2024-12-14T03-00-00-000Z.sql")
        .await
        .expect("backup stored");
    assert_eq!(stored.content_type, BACKUP_CONTENT_TYPE);
    assert_eq!(stored.body, b"CREATE TABLE \"events\" ();\n".to_vec());
}

#[tokio::test]
async fn test_backup_fails_when_bucket_missing() {
    let h = Harness::new();
    h.objects.remove_bucket(BACKUP_BUCKET).await;

    let response = h
        .jobs
        .run(JobKind::BackupDatabase, at("2024-12-14T03:00:00Z"))
        .await;

    let json = body(&response);
    assert_eq!(response.http_status(), 500);
    assert_eq!(json["error"], "Failed to backup database");
    assert!(json["details"]["message"].is_string());
    assert!(h.objects.keys(BACKUP_BUCKET).await.is_empty());
}

#[tokio::test]
async fn test_backup_fails_when_dump_fails() {
    let h = Harness::with(WorkerConfig::default(), StaticBackupSource::failing());

    let response = h
        .jobs
        .run(JobKind::BackupDatabase, at("2024-12-14T03:00:00Z"))
        .await;

    assert_eq!(response.http_status(), 500);
    assert!(h.locks.holder("backup-database").await.is_none());
}
