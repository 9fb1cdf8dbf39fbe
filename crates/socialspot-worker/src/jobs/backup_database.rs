// Logical database backup into object storage

use chrono::{DateTime, Utc};
use serde_json::json;
use socialspot_core::{CoreError, Result};
use tracing::info;

use super::Jobs;
use crate::report::JobResponse;

pub const BACKUP_BUCKET: &str = "database-backups";
pub const BACKUP_CONTENT_TYPE: &str = "application/sql";

/// `backup-{environment}-{timestamp}.sql` with a filesystem-safe ISO timestamp,
/// e.g. `backup-prod-2024-12-14T15-03-00-000Z.sql`
pub fn backup_file_name(environment: &str, now: DateTime<Utc>) -> String {
    format!(
        "backup-{environment}-{}.sql",
        now.format("%Y-%m-%dT%H-%M-%S-%3fZ")
    )
}

pub(super) async fn run(jobs: &Jobs, now: DateTime<Utc>) -> Result<JobResponse> {
    let objects = &jobs.deps.objects;
    objects.check_bucket(BACKUP_BUCKET).await?;

    let dump = jobs.deps.backups.dump_sql().await?;
    let file = backup_file_name(&jobs.config.environment, now);
    let size = dump.len();
    objects
        .put_object(BACKUP_BUCKET, &file, dump.into_bytes(), BACKUP_CONTENT_TYPE)
        .await?;

    info!(file = %file, bytes = size, bucket = BACKUP_BUCKET, "Database backup uploaded");
    Ok(JobResponse::BackedUp {
        message: "Database backup completed successfully".to_string(),
        file,
    })
}

pub(super) fn failure(error: &CoreError) -> JobResponse {
    JobResponse::Failed {
        error: "Failed to backup database".to_string(),
        details: Some(json!({ "message": error.to_string() })),
    }
}
