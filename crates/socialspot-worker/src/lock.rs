// Scoped job lease
//
// A JobLease is claimed at the start of a run and released at the end.
// `release()` is the normal path; Drop covers panics and early returns by
// spawning the release on the current runtime.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use socialspot_core::{JobLockStore, Result};
use tracing::{debug, warn};
use uuid::Uuid;

pub struct JobLease {
    store: Arc<dyn JobLockStore>,
    job: String,
    holder: String,
    released: bool,
}

impl JobLease {
    /// Try to claim `job`. `Ok(None)` means another run holds an unexpired lease.
    pub async fn acquire(
        store: Arc<dyn JobLockStore>,
        job: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Option<Self>> {
        let holder = Uuid::now_v7().to_string();
        if !store.try_acquire(job, &holder, now, ttl).await? {
            return Ok(None);
        }
        debug!(job, holder = %holder, "Acquired job lease");
        Ok(Some(Self {
            store,
            job: job.to_string(),
            holder,
            released: false,
        }))
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Release the lease. Errors are logged; an unreleased lease expires on its own.
    pub async fn release(mut self) {
        self.released = true;
        match self.store.release(&self.job, &self.holder).await {
            Ok(()) => debug!(job = %self.job, "Released job lease"),
            Err(e) => warn!(job = %self.job, error = %e, "Failed to release job lease"),
        }
    }
}

impl Drop for JobLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let store = Arc::clone(&self.store);
        let job = std::mem::take(&mut self.job);
        let holder = std::mem::take(&mut self.holder);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = store.release(&job, &holder).await {
                        warn!(job = %job, error = %e, "Failed to release dropped job lease");
                    }
                });
            }
            Err(_) => warn!(job = %job, "Job lease dropped outside a runtime; it will expire"),
        }
    }
}
