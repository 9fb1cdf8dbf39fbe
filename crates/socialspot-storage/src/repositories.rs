// Repository layer for database operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::*;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create database connection from URL
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // ============================================
    // Sessions and users (owned by the auth provider)
    // ============================================

    /// Resolve a session token to its user, ignoring expired sessions
    pub async fn find_session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionUserRow>> {
        let row = sqlx::query_as::<_, SessionUserRow>(
            r#"
            SELECT s.user_id, u.email, u.name, s.expires_at
            FROM session s
            JOIN "user" u ON u.id = s.user_id
            WHERE s.token = $1 AND s.expires_at > $2
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_user_contact(&self, user_id: &str) -> Result<Option<UserContactRow>> {
        let row = sqlx::query_as::<_, UserContactRow>(
            r#"
            SELECT u.id, u.email, p.first_name
            FROM "user" u
            LEFT JOIN profile p ON p.user_id = u.id
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    // ============================================
    // Profiles
    // ============================================

    pub async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRow>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT user_id, first_name, age, interests, instagram_handle, created_at, updated_at
            FROM profile
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn create_profile(&self, input: UpsertProfile) -> Result<ProfileRow> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            INSERT INTO profile (user_id, first_name, age, interests, instagram_handle)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING user_id, first_name, age, interests, instagram_handle, created_at, updated_at
            "#,
        )
        .bind(&input.user_id)
        .bind(&input.first_name)
        .bind(input.age)
        .bind(&input.interests)
        .bind(&input.instagram_handle)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Returns `None` when the user has no profile row
    pub async fn update_profile(&self, input: UpsertProfile) -> Result<Option<ProfileRow>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            UPDATE profile
            SET
                first_name = $2,
                age = $3,
                interests = $4,
                instagram_handle = $5,
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING user_id, first_name, age, interests, instagram_handle, created_at, updated_at
            "#,
        )
        .bind(&input.user_id)
        .bind(&input.first_name)
        .bind(input.age)
        .bind(&input.interests)
        .bind(&input.instagram_handle)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    // ============================================
    // Events and participants
    // ============================================

    pub async fn get_event(&self, event_id: i64) -> Result<Option<EventRow>> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT event_id, name, description, location, image_url, age, cost, max_participants,
                   timezone, start_time, end_time, repeating_event_id, created_at, updated_at
            FROM events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn event_exists(&self, event_id: i64) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events WHERE event_id = $1)")
                .bind(event_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    pub async fn insert_event(&self, row: &EventRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO events (event_id, name, description, location, image_url, age, cost,
                                max_participants, timezone, start_time, end_time,
                                repeating_event_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(row.event_id)
        .bind(&row.name)
        .bind(&row.description)
        .bind(&row.location)
        .bind(&row.image_url)
        .bind(&row.age)
        .bind(row.cost)
        .bind(row.max_participants)
        .bind(&row.timezone)
        .bind(row.start_time)
        .bind(row.end_time)
        .bind(&row.repeating_event_id)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn count_participants(&self, event_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM event_participants WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    pub async fn is_participant(&self, event_id: i64, user_id: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM event_participants WHERE event_id = $1 AND user_id = $2)",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Returns false when the user was already registered
    pub async fn add_participant(&self, event_id: i64, user_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO event_participants (event_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (event_id, user_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Earliest occurrence of a series that has not ended yet
    pub async fn next_in_series(
        &self,
        repeating_event_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>> {
        let id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT event_id
            FROM events
            WHERE repeating_event_id = $1 AND end_time > $2
            ORDER BY start_time ASC
            LIMIT 1
            "#,
        )
        .bind(repeating_event_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    /// Most recent occurrence of a series
    pub async fn latest_in_series(&self, repeating_event_id: &str) -> Result<Option<i64>> {
        let id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT event_id
            FROM events
            WHERE repeating_event_id = $1
            ORDER BY start_time DESC
            LIMIT 1
            "#,
        )
        .bind(repeating_event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    // ============================================
    // Messages
    // ============================================

    pub async fn create_message(&self, input: CreateMessage) -> Result<MessageRow> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (sender_id, receiver_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, sender_id, receiver_id, content, timestamp, read_at
            "#,
        )
        .bind(&input.sender_id)
        .bind(&input.receiver_id)
        .bind(&input.content)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Both directions of a conversation, oldest first
    pub async fn list_conversation(&self, user_a: &str, user_b: &str) -> Result<Vec<MessageRow>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, sender_id, receiver_id, content, timestamp, read_at
            FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Mark unread messages from `sender_id` to `receiver_id` as read
    pub async fn mark_conversation_read(&self, sender_id: &str, receiver_id: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET read_at = NOW()
            WHERE sender_id = $1 AND receiver_id = $2 AND read_at IS NULL
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Mark every unread message between two users as read, in both directions
    pub async fn mark_pair_read(&self, user_a: &str, user_b: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET read_at = NOW()
            WHERE read_at IS NULL
              AND ((sender_id = $1 AND receiver_id = $2)
                OR (sender_id = $2 AND receiver_id = $1))
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Latest message with each conversation partner, newest first
    pub async fn recent_chats(&self, user_id: &str, limit: i64) -> Result<Vec<RecentChatRow>> {
        let rows = sqlx::query_as::<_, RecentChatRow>(
            r#"
            WITH ranked AS (
                SELECT
                    CASE WHEN m.sender_id = $1 THEN m.receiver_id ELSE m.sender_id END AS partner_id,
                    m.content,
                    m.timestamp,
                    ROW_NUMBER() OVER (
                        PARTITION BY CASE WHEN m.sender_id = $1 THEN m.receiver_id ELSE m.sender_id END
                        ORDER BY m.timestamp DESC, m.id DESC
                    ) AS rn
                FROM messages m
                WHERE m.sender_id = $1 OR m.receiver_id = $1
            )
            SELECT r.partner_id AS user_id, p.first_name, r.content AS last_message, r.timestamp
            FROM ranked r
            JOIN profile p ON p.user_id = r.partner_id
            WHERE r.rn = 1
            ORDER BY r.timestamp DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Number of distinct senders with unread messages for `user_id`
    pub async fn unread_sender_count(&self, user_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT sender_id)
            FROM messages
            WHERE receiver_id = $1 AND read_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    // ============================================
    // Matches
    // ============================================

    /// Connection between two users for one event, in either direction
    pub async fn find_connection(
        &self,
        user_a: &str,
        user_b: &str,
        event_id: i64,
    ) -> Result<Option<MatchRow>> {
        let row = sqlx::query_as::<_, MatchRow>(
            r#"
            SELECT id, user_id_1, user_id_2, event_id, status, created_at, matched_at
            FROM matches
            WHERE event_id = $3
              AND status <> 'deleted'
              AND ((user_id_1 = $1 AND user_id_2 = $2)
                OR (user_id_1 = $2 AND user_id_2 = $1))
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn create_pending_match(
        &self,
        requester: &str,
        counterpart: &str,
        event_id: i64,
    ) -> Result<MatchRow> {
        let row = sqlx::query_as::<_, MatchRow>(
            r#"
            INSERT INTO matches (user_id_1, user_id_2, event_id, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING id, user_id_1, user_id_2, event_id, status, created_at, matched_at
            "#,
        )
        .bind(requester)
        .bind(counterpart)
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn accept_match(&self, match_id: i64, now: DateTime<Utc>) -> Result<Option<MatchRow>> {
        let row = sqlx::query_as::<_, MatchRow>(
            r#"
            UPDATE matches
            SET status = 'matched', matched_at = $2
            WHERE id = $1 AND status = 'pending'
            RETURNING id, user_id_1, user_id_2, event_id, status, created_at, matched_at
            "#,
        )
        .bind(match_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Matched connection between two users for any event
    pub async fn find_matched(&self, user_a: &str, user_b: &str) -> Result<Option<MatchRow>> {
        let row = sqlx::query_as::<_, MatchRow>(
            r#"
            SELECT id, user_id_1, user_id_2, event_id, status, created_at, matched_at
            FROM matches
            WHERE status = 'matched'
              AND ((user_id_1 = $1 AND user_id_2 = $2)
                OR (user_id_1 = $2 AND user_id_2 = $1))
            LIMIT 1
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn delete_match(&self, match_id: i64) -> Result<()> {
        sqlx::query("UPDATE matches SET status = 'deleted' WHERE id = $1")
            .bind(match_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ============================================
    // Reports
    // ============================================

    pub async fn create_report(
        &self,
        reported_by: &str,
        reported_user_id: &str,
        reason: &str,
    ) -> Result<ReportRow> {
        let row = sqlx::query_as::<_, ReportRow>(
            r#"
            INSERT INTO reports (reported_by, reported_user_id, reason)
            VALUES ($1, $2, $3)
            RETURNING id, reported_by, reported_user_id, reason, created_at
            "#,
        )
        .bind(reported_by)
        .bind(reported_user_id)
        .bind(reason)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}
