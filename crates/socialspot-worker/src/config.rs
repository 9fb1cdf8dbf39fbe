// Worker configuration, loaded from environment variables

use std::env;
use std::str::FromStr;
use std::time::Duration;

use socialspot_core::{CoreError, Result, SeriesMatch, SiteConfig, EVENT_ID_SPACE};

/// Default cap on recipients or items handled per run
pub const DEFAULT_BATCH_LIMIT: i64 = 50;
/// Default lease length; a crashed run blocks the job for at most this long
pub const DEFAULT_LOCK_TTL_SECS: i64 = 15 * 60;
pub const DEFAULT_ID_ALLOCATION_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_JOB_INTERVAL_SECS: u64 = 60 * 60;
pub const DEFAULT_BACKUP_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Tunables shared by every job plus the built-in scheduler cadence
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum recipients per milestone or digest run
    pub batch_limit: i64,
    pub lock_ttl: chrono::Duration,
    pub series_match: SeriesMatch,
    pub id_allocation_max_attempts: u32,
    /// New event ids are drawn from `[0, event_id_space)`
    pub event_id_space: i64,
    /// `prod` or `dev`, used in backup file names
    pub environment: String,
    pub site: SiteConfig,
    /// Whether the worker binary runs the built-in scheduler
    pub scheduler_enabled: bool,
    pub job_interval: Duration,
    pub backup_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_limit: DEFAULT_BATCH_LIMIT,
            lock_ttl: chrono::Duration::seconds(DEFAULT_LOCK_TTL_SECS),
            series_match: SeriesMatch::default(),
            id_allocation_max_attempts: DEFAULT_ID_ALLOCATION_MAX_ATTEMPTS,
            event_id_space: EVENT_ID_SPACE,
            environment: "dev".to_string(),
            site: SiteConfig::default(),
            scheduler_enabled: true,
            job_interval: Duration::from_secs(DEFAULT_JOB_INTERVAL_SECS),
            backup_interval: Duration::from_secs(DEFAULT_BACKUP_INTERVAL_SECS),
        }
    }
}

impl WorkerConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `JOB_BATCH_LIMIT`: recipients per run (default: 50)
    /// - `JOB_LOCK_TTL_SECS`: lease length (default: 900)
    /// - `RECREATE_SERIES_MATCH`: `name_and_series` (default) or `series_only`
    /// - `ID_ALLOCATION_MAX_ATTEMPTS`: id sampling attempts (default: 10)
    /// - `DATABASE_URL`: a `-prod-` host marks backups as prod
    /// - `SCHEDULER_ENABLED`: run jobs on a timer (default: true)
    /// - `JOB_INTERVAL_SECS`, `BACKUP_INTERVAL_SECS`: scheduler cadence
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let database_url = env::var("DATABASE_URL").unwrap_or_default();

        let config = Self {
            batch_limit: parse_var("JOB_BATCH_LIMIT", defaults.batch_limit)?,
            lock_ttl: chrono::Duration::seconds(parse_var(
                "JOB_LOCK_TTL_SECS",
                DEFAULT_LOCK_TTL_SECS,
            )?),
            series_match: parse_var("RECREATE_SERIES_MATCH", defaults.series_match)?,
            id_allocation_max_attempts: parse_var(
                "ID_ALLOCATION_MAX_ATTEMPTS",
                defaults.id_allocation_max_attempts,
            )?,
            event_id_space: defaults.event_id_space,
            environment: environment_for(&database_url).to_string(),
            site: SiteConfig::from_env(),
            scheduler_enabled: env::var("SCHEDULER_ENABLED")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(true),
            job_interval: Duration::from_secs(parse_var(
                "JOB_INTERVAL_SECS",
                DEFAULT_JOB_INTERVAL_SECS,
            )?),
            backup_interval: Duration::from_secs(parse_var(
                "BACKUP_INTERVAL_SECS",
                DEFAULT_BACKUP_INTERVAL_SECS,
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_limit <= 0 {
            return Err(CoreError::config("JOB_BATCH_LIMIT must be positive"));
        }
        if self.lock_ttl <= chrono::Duration::zero() {
            return Err(CoreError::config("JOB_LOCK_TTL_SECS must be positive"));
        }
        if self.id_allocation_max_attempts == 0 {
            return Err(CoreError::config(
                "ID_ALLOCATION_MAX_ATTEMPTS must be at least 1",
            ));
        }
        if self.event_id_space <= 0 {
            return Err(CoreError::config("event id space must be positive"));
        }
        if self.job_interval.is_zero() || self.backup_interval.is_zero() {
            return Err(CoreError::config("scheduler intervals must be positive"));
        }
        Ok(())
    }
}

/// `prod` when the database host carries the `-prod-` marker
pub fn environment_for(database_url: &str) -> &'static str {
    if database_url.contains("-prod-") {
        "prod"
    } else {
        "dev"
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| CoreError::config(format!("invalid {name}: {e}"))),
        _ => Ok(default),
    }
}
