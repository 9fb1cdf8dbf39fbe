// Built-in timer that runs every job on its cadence
//
// Each job gets its own loop so a slow backup never delays reminders. The
// lease inside `Jobs::run` still guards against overlap with HTTP triggers
// or another worker replica. Ticks are aligned to wall-clock multiples of the
// period (plus a short offset) so an hourly run always lands just after HH:00
// and covers the whole previous hour.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::jobs::{JobKind, Jobs};

/// Runs start this long after each slot boundary
pub const SLOT_OFFSET: Duration = Duration::from_secs(60);

pub struct Scheduler {
    jobs: Jobs,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Scheduler {
    pub fn new(jobs: Jobs) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            jobs,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// How often `kind` runs
    pub fn interval_for(&self, kind: JobKind) -> Duration {
        match kind {
            JobKind::BackupDatabase => self.jobs.config().backup_interval,
            _ => self.jobs.config().job_interval,
        }
    }

    /// Run all job loops until [`Scheduler::shutdown`] is called
    pub async fn run(&self) {
        info!(
            job_interval_secs = self.jobs.config().job_interval.as_secs(),
            backup_interval_secs = self.jobs.config().backup_interval.as_secs(),
            "Starting job scheduler"
        );

        let loops = JobKind::ALL.into_iter().map(|kind| {
            let jobs = self.jobs.clone();
            let period = self.interval_for(kind);
            let shutdown_rx = self.shutdown_rx.clone();
            tokio::spawn(job_loop(jobs, kind, period, shutdown_rx))
        });
        for result in join_all(loops).await {
            if let Err(e) = result {
                warn!(error = %e, "Job loop exited abnormally");
            }
        }

        info!("Job scheduler stopped");
    }

    /// Signal every job loop to stop after its current run
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

async fn job_loop(
    jobs: Jobs,
    kind: JobKind,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let delay = delay_until_next_slot(Utc::now(), period);
    debug!(job = %kind, delay_secs = delay.as_secs(), "Waiting for first slot");
    let mut ticker = tokio::time::interval_at(Instant::now() + delay, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        if *shutdown_rx.borrow() {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {
                let response = jobs.run(kind, Utc::now()).await;
                debug!(job = %kind, status = response.http_status(), "Scheduled run finished");
            }
            _ = shutdown_rx.changed() => {
                debug!(job = %kind, "Shutdown during job wait");
                break;
            }
        }
    }
}

/// Time from `now` until the next `k * period + SLOT_OFFSET` since the epoch
pub fn delay_until_next_slot(now: DateTime<Utc>, period: Duration) -> Duration {
    let period_ms = period.as_millis() as i64;
    if period_ms == 0 {
        return Duration::ZERO;
    }
    let shifted = now.timestamp_millis() - SLOT_OFFSET.as_millis() as i64;
    match shifted.rem_euclid(period_ms) {
        0 => Duration::ZERO,
        into => Duration::from_millis((period_ms - into) as u64),
    }
}
