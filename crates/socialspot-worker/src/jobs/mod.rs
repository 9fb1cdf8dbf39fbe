// Scheduled jobs
//
// Every job follows the same orchestration:
// 1. claim the job lease (a concurrent run gets "Job already running")
// 2. derive its window from one `now` sample
// 3. select candidates with the idempotency guard built into the query
// 4. process candidates concurrently, one outcome per candidate
// 5. release the lease on every path

mod backup_database;
mod dispatch;
mod event_milestones;
mod message_notifications;
mod recreate_events;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use socialspot_core::{
    BackupSource, BuildHook, CoreError, DigestStore, JobLockStore, Mailer, Milestone,
    MilestoneStore, ObjectStore, RecreationStore, Result,
};
use tracing::{error, info, warn};

use crate::config::WorkerConfig;
use crate::lock::JobLease;
use crate::report::JobResponse;

pub use backup_database::{backup_file_name, BACKUP_BUCKET, BACKUP_CONTENT_TYPE};
pub use recreate_events::allocate_event_id;

/// The scheduled jobs, named as in their trigger paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    RecreateEvents,
    SendEventReminder,
    SendEventFollowup,
    SendMessageNotifications,
    BackupDatabase,
}

impl JobKind {
    pub const ALL: [JobKind; 5] = [
        JobKind::RecreateEvents,
        JobKind::SendEventReminder,
        JobKind::SendEventFollowup,
        JobKind::SendMessageNotifications,
        JobKind::BackupDatabase,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            JobKind::RecreateEvents => "recreate-events",
            JobKind::SendEventReminder => "send-event-reminder",
            JobKind::SendEventFollowup => "send-event-followup",
            JobKind::SendMessageNotifications => "send-message-notifications",
            JobKind::BackupDatabase => "backup-database",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for JobKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        JobKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| CoreError::validation(format!("Unknown job: {s}")))
    }
}

/// Everything the jobs talk to, constructed once at start-up
#[derive(Clone)]
pub struct JobDependencies {
    pub recreation: Arc<dyn RecreationStore>,
    pub milestones: Arc<dyn MilestoneStore>,
    pub digests: Arc<dyn DigestStore>,
    pub locks: Arc<dyn JobLockStore>,
    pub backups: Arc<dyn BackupSource>,
    pub mailer: Arc<dyn Mailer>,
    pub build_hook: Arc<dyn BuildHook>,
    pub objects: Arc<dyn ObjectStore>,
}

#[derive(Clone)]
pub struct Jobs {
    deps: JobDependencies,
    config: WorkerConfig,
}

impl Jobs {
    pub fn new(deps: JobDependencies, config: WorkerConfig) -> Self {
        Self { deps, config }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run one job invocation at `now` and summarize it
    pub async fn run(&self, kind: JobKind, now: DateTime<Utc>) -> JobResponse {
        let lease = match JobLease::acquire(
            Arc::clone(&self.deps.locks),
            kind.name(),
            now,
            self.config.lock_ttl,
        )
        .await
        {
            Ok(Some(lease)) => lease,
            Ok(None) => {
                warn!(job = %kind, "Skipping run, another invocation holds the lease");
                return JobResponse::already_running();
            }
            Err(e) => {
                error!(job = %kind, error = %e, "Failed to acquire job lease");
                return JobResponse::internal_error();
            }
        };

        info!(job = %kind, holder = %lease.holder(), now = %now, "Job started");
        let outcome = self.run_pipeline(kind, now).await;
        lease.release().await;

        match outcome {
            Ok(response) => {
                info!(
                    job = %kind,
                    processed = response.results().len(),
                    failed = response.results().iter().filter(|r| !r.success()).count(),
                    "Job finished"
                );
                response
            }
            Err(e) => {
                error!(job = %kind, error = %e, "Job aborted");
                match kind {
                    JobKind::BackupDatabase => backup_database::failure(&e),
                    _ => JobResponse::internal_error(),
                }
            }
        }
    }

    async fn run_pipeline(&self, kind: JobKind, now: DateTime<Utc>) -> Result<JobResponse> {
        match kind {
            JobKind::RecreateEvents => recreate_events::run(self, now).await,
            JobKind::SendEventReminder => {
                event_milestones::run(self, Milestone::Reminder, now).await
            }
            JobKind::SendEventFollowup => {
                event_milestones::run(self, Milestone::Followup, now).await
            }
            JobKind::SendMessageNotifications => message_notifications::run(self, now).await,
            JobKind::BackupDatabase => backup_database::run(self, now).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_kind_parses_trigger_names() {
        for kind in JobKind::ALL {
            assert_eq!(kind.name().parse::<JobKind>().unwrap(), kind);
        }
        assert!("send-everything".parse::<JobKind>().is_err());
    }
}
