// Production wiring: Postgres stores plus the real providers

use std::sync::Arc;

use anyhow::{Context, Result};
use socialspot_providers::{
    MailjetConfig, MailjetMailer, R2Config, R2ObjectStore, WebhookBuildHook,
};
use socialspot_storage::{Database, DbBackupSource, DbJobLockStore, DbJobStore};

use crate::config::WorkerConfig;
use crate::jobs::{JobDependencies, Jobs};

/// Build the job dependencies over `db`, reading provider credentials from the environment
pub fn dependencies_from_env(db: &Database) -> Result<JobDependencies> {
    let store = Arc::new(DbJobStore::new(db.clone()));
    let mailer = MailjetMailer::new(MailjetConfig::from_env()?)
        .context("Failed to create Mailjet client")?;
    let build_hook = WebhookBuildHook::from_env().context("Failed to create build hook client")?;
    let objects = R2ObjectStore::new(&R2Config::from_env()?);

    Ok(JobDependencies {
        recreation: store.clone(),
        milestones: store.clone(),
        digests: store,
        locks: Arc::new(DbJobLockStore::new(db.clone())),
        backups: Arc::new(DbBackupSource::new(db.clone())),
        mailer: Arc::new(mailer),
        build_hook: Arc::new(build_hook),
        objects: Arc::new(objects),
    })
}

/// Jobs wired for production with configuration from the environment
pub fn jobs_from_env(db: &Database) -> Result<Jobs> {
    let config = WorkerConfig::from_env().context("Invalid worker configuration")?;
    Ok(Jobs::new(dependencies_from_env(db)?, config))
}
