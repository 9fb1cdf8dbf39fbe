// Database-backed job leases
//
// A lease is one row in job_locks. Acquiring either inserts the row or takes
// over an expired one in a single statement, so two concurrent invocations
// can never both win.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use socialspot_core::{CoreError, JobLockStore, Result};

use crate::repositories::Database;

#[derive(Clone)]
pub struct DbJobLockStore {
    db: Database,
}

impl DbJobLockStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl JobLockStore for DbJobLockStore {
    async fn try_acquire(
        &self,
        job: &str,
        holder: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<bool> {
        let acquired: Option<String> = sqlx::query_scalar(
            r#"
            INSERT INTO job_locks (job_name, holder, locked_until)
            VALUES ($1, $2, $3)
            ON CONFLICT (job_name) DO UPDATE
                SET holder = EXCLUDED.holder,
                    locked_until = EXCLUDED.locked_until
                WHERE job_locks.locked_until <= $4
            RETURNING job_name
            "#,
        )
        .bind(job)
        .bind(holder)
        .bind(now + ttl)
        .bind(now)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| CoreError::store(e.to_string()))?;

        Ok(acquired.is_some())
    }

    async fn release(&self, job: &str, holder: &str) -> Result<()> {
        sqlx::query("DELETE FROM job_locks WHERE job_name = $1 AND holder = $2")
            .bind(job)
            .bind(holder)
            .execute(self.db.pool())
            .await
            .map_err(|e| CoreError::store(e.to_string()))?;

        Ok(())
    }
}
