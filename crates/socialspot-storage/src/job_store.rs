// Database-backed stores for the scheduled jobs
//
// Implements the core RecreationStore, MilestoneStore and DigestStore traits.
// Every "already handled" check lives inside the candidate query itself so a
// rerun over an overlapping window selects nothing new.

use async_trait::async_trait;
use socialspot_core::{
    CoreError, DigestStore, DigestWindow, Event, MessageDigest, Milestone, MilestoneStore,
    ParticipantRecipient, RecreationStore, Result, SeriesMatch, TimeWindow,
};

use crate::models::{EventRow, MessageDigestRow, ParticipantRecipientRow};
use crate::repositories::Database;

// ============================================================================
// DbJobStore - Candidate queries and markers
// ============================================================================

/// Database-backed store shared by the recreation, milestone and digest jobs
#[derive(Clone)]
pub struct DbJobStore {
    db: Database,
}

impl DbJobStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn to_store_error(e: impl std::fmt::Display) -> CoreError {
    CoreError::store(e.to_string())
}

impl From<&Event> for EventRow {
    fn from(event: &Event) -> Self {
        EventRow {
            event_id: event.event_id,
            name: event.name.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
            image_url: event.image_url.clone(),
            age: event.age.clone(),
            cost: event.cost,
            max_participants: event.max_participants,
            timezone: event.timezone.clone(),
            start_time: event.start_time,
            end_time: event.end_time,
            repeating_event_id: event.repeating_event_id.clone(),
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

#[async_trait]
impl RecreationStore for DbJobStore {
    async fn expiring_occurrences(
        &self,
        window: &TimeWindow,
        matching: SeriesMatch,
    ) -> Result<Vec<Event>> {
        let series_only = matching == SeriesMatch::SeriesOnly;
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT e1.event_id, e1.name, e1.description, e1.location, e1.image_url, e1.age,
                   e1.cost, e1.max_participants, e1.timezone, e1.start_time, e1.end_time,
                   e1.repeating_event_id, e1.created_at, e1.updated_at
            FROM events e1
            WHERE e1.end_time >= $1
              AND e1.end_time < $2
              AND e1.repeating_event_id IS NOT NULL
              AND NOT EXISTS (
                  SELECT 1
                  FROM events e2
                  WHERE e2.repeating_event_id = e1.repeating_event_id
                    AND e2.event_id <> e1.event_id
                    AND e2.end_time > e1.end_time
                    AND ($3 OR e2.name = e1.name)
              )
            ORDER BY e1.end_time ASC, e1.event_id ASC
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .bind(series_only)
        .fetch_all(self.db.pool())
        .await
        .map_err(to_store_error)?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn event_id_exists(&self, event_id: i64) -> Result<bool> {
        self.db.event_exists(event_id).await.map_err(to_store_error)
    }

    async fn insert_event(&self, event: &Event) -> Result<()> {
        self.db
            .insert_event(&EventRow::from(event))
            .await
            .map_err(to_store_error)
    }
}

#[async_trait]
impl MilestoneStore for DbJobStore {
    async fn pending_recipients(
        &self,
        milestone: Milestone,
        window: &TimeWindow,
        limit: i64,
    ) -> Result<Vec<ParticipantRecipient>> {
        // Table and column names come from a closed enum, never from input
        let sql = format!(
            r#"
            SELECT e.event_id, e.name AS event_name, e.location, e.start_time, e.end_time,
                   u.id AS user_id, u.email, p.first_name
            FROM events e
            JOIN event_participants ep ON ep.event_id = e.event_id
            JOIN "user" u ON u.id = ep.user_id
            JOIN profile p ON p.user_id = u.id
            WHERE e.{anchor} >= $1
              AND e.{anchor} < $2
              AND NOT EXISTS (
                  SELECT 1
                  FROM {markers} mk
                  WHERE mk.event_id = e.event_id AND mk.user_id = u.id
              )
            ORDER BY e.{anchor} ASC, e.event_id ASC, u.id ASC
            LIMIT $3
            "#,
            anchor = milestone.anchor_column(),
            markers = milestone.marker_table(),
        );

        let rows = sqlx::query_as::<_, ParticipantRecipientRow>(&sql)
            .bind(window.start)
            .bind(window.end)
            .bind(limit)
            .fetch_all(self.db.pool())
            .await
            .map_err(to_store_error)?;

        Ok(rows
            .into_iter()
            .map(|row| ParticipantRecipient {
                event_id: row.event_id,
                event_name: row.event_name,
                location: row.location,
                start_time: row.start_time,
                end_time: row.end_time,
                user_id: row.user_id,
                email: row.email,
                first_name: row.first_name,
            })
            .collect())
    }

    async fn mark_sent(&self, milestone: Milestone, event_id: i64, user_id: &str) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (event_id, user_id, sent_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (event_id, user_id) DO NOTHING",
            milestone.marker_table()
        );

        sqlx::query(&sql)
            .bind(event_id)
            .bind(user_id)
            .execute(self.db.pool())
            .await
            .map_err(to_store_error)?;

        Ok(())
    }
}

#[async_trait]
impl DigestStore for DbJobStore {
    async fn pending_digests(
        &self,
        window: &DigestWindow,
        limit: i64,
    ) -> Result<Vec<MessageDigest>> {
        let rows = sqlx::query_as::<_, MessageDigestRow>(
            r#"
            WITH unread AS (
                SELECT m.id, m.sender_id, m.receiver_id
                FROM messages m
                WHERE m.read_at IS NULL
                  AND m.timestamp >= $1
                  AND m.timestamp <= $2
                  AND NOT EXISTS (
                      SELECT 1 FROM message_notifications mn WHERE mn.message_id = m.id
                  )
            )
            SELECT u.id AS user_id,
                   u.email,
                   rp.first_name,
                   COUNT(DISTINCT um.sender_id) AS unique_senders,
                   ARRAY_AGG(DISTINCT sp.first_name) AS sender_names,
                   ARRAY_AGG(um.id ORDER BY um.id) AS message_ids
            FROM unread um
            JOIN "user" u ON u.id = um.receiver_id
            JOIN profile rp ON rp.user_id = u.id
            JOIN profile sp ON sp.user_id = um.sender_id
            WHERE NOT EXISTS (
                SELECT 1
                FROM message_notifications mn
                WHERE mn.user_id = u.id AND mn.sent_at > $3
            )
            GROUP BY u.id, u.email, rp.first_name
            ORDER BY u.id ASC
            LIMIT $4
            "#,
        )
        .bind(window.lookback_from)
        .bind(window.settled_before)
        .bind(window.dedup_since)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await
        .map_err(to_store_error)?;

        Ok(rows
            .into_iter()
            .map(|row| MessageDigest {
                user_id: row.user_id,
                email: row.email,
                first_name: row.first_name,
                unique_senders: row.unique_senders,
                sender_names: row.sender_names,
                message_ids: row.message_ids,
            })
            .collect())
    }

    async fn mark_notified(&self, user_id: &str, message_ids: &[i64]) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO message_notifications (user_id, message_id, sent_at)
            SELECT $1, id, NOW() FROM UNNEST($2::BIGINT[]) AS id
            ON CONFLICT (message_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(message_ids)
        .execute(self.db.pool())
        .await
        .map_err(to_store_error)?;

        Ok(())
    }
}
