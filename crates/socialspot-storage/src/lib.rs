// Postgres storage layer with sqlx
//
// This crate provides database implementations for core traits:
// - DbJobStore: RecreationStore, MilestoneStore and DigestStore for the scheduled jobs
// - DbJobLockStore: JobLockStore leases in job_locks
// - DbBackupSource: BackupSource producing a SQL dump

pub mod backup;
pub mod job_store;
pub mod lock_store;
pub mod models;
pub mod repositories;

pub use backup::DbBackupSource;
pub use job_store::DbJobStore;
pub use lock_store::DbJobLockStore;
pub use models::*;
pub use repositories::*;
