// Recurring-event recreation
//
// Once an occurrence of a series has ended, insert the next one a week later
// unless the series already has a later occurrence.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use rand::Rng;
use socialspot_core::{next_occurrence, CoreError, Event, RecreationStore, Result, TimeWindow};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::Jobs;
use crate::report::{JobResponse, RecreationOutcome};

pub(super) async fn run(jobs: &Jobs, now: DateTime<Utc>) -> Result<JobResponse> {
    let window = TimeWindow::recreation(now);
    let candidates = jobs
        .deps
        .recreation
        .expiring_occurrences(&window, jobs.config.series_match)
        .await?;

    info!(
        count = candidates.len(),
        start = %window.start,
        end = %window.end,
        matching = %jobs.config.series_match,
        "Selected occurrences to recreate"
    );
    if candidates.is_empty() {
        return Ok(JobResponse::nothing_to_do(
            "No events to recreate",
            Some(window),
        ));
    }

    // Ids handed out during this run, so concurrent items never pick the same one
    let reserved = Mutex::new(HashSet::new());
    let results = join_all(
        candidates
            .iter()
            .map(|event| recreate_one(jobs, event, now, &reserved)),
    )
    .await;

    if results.iter().any(|r| r.success) {
        // Best effort: never retried and never fails the run
        if let Err(e) = jobs.deps.build_hook.trigger().await {
            warn!(error = %e, "Site rebuild webhook failed");
        }
    }

    Ok(JobResponse::completed(results, Some(window)))
}

async fn recreate_one(
    jobs: &Jobs,
    source: &Event,
    now: DateTime<Utc>,
    reserved: &Mutex<HashSet<i64>>,
) -> RecreationOutcome {
    match try_recreate(jobs, source, now, reserved).await {
        Ok(new_event_id) => {
            info!(
                original_event_id = source.event_id,
                new_event_id,
                "Recreated occurrence"
            );
            RecreationOutcome::created(source.event_id, new_event_id)
        }
        Err(e) => {
            error!(original_event_id = source.event_id, error = %e, "Failed to recreate occurrence");
            RecreationOutcome::failed(source.event_id, e)
        }
    }
}

async fn try_recreate(
    jobs: &Jobs,
    source: &Event,
    now: DateTime<Utc>,
    reserved: &Mutex<HashSet<i64>>,
) -> Result<i64> {
    // Validate before spending id lookups on a broken source
    next_occurrence(source, source.event_id, now)?;

    let new_event_id = allocate_event_id(
        jobs.deps.recreation.as_ref(),
        jobs.config.event_id_space,
        jobs.config.id_allocation_max_attempts,
        reserved,
    )
    .await?;
    let next = next_occurrence(source, new_event_id, now)?;
    jobs.deps.recreation.insert_event(&next).await?;
    Ok(new_event_id)
}

/// Sample ids uniformly from `[0, id_space)` until one is free, at most
/// `max_attempts` times. Ids in `reserved` count as taken; the winner is added.
pub async fn allocate_event_id(
    store: &dyn RecreationStore,
    id_space: i64,
    max_attempts: u32,
    reserved: &Mutex<HashSet<i64>>,
) -> Result<i64> {
    for attempt in 1..=max_attempts {
        let candidate = rand::thread_rng().gen_range(0..id_space);
        if reserved.lock().await.contains(&candidate) {
            continue;
        }
        if store.event_id_exists(candidate).await? {
            debug!(candidate, attempt, "Event id collision");
            continue;
        }
        // Another item may have reserved it while we checked the store
        if reserved.lock().await.insert(candidate) {
            return Ok(candidate);
        }
    }
    Err(CoreError::IdSpaceExhausted(max_attempts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use socialspot_core::memory::InMemoryStore;

    fn event(id: i64) -> Event {
        let start = DateTime::parse_from_rfc3339("2024-12-14T07:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Event {
            event_id: id,
            name: "Trivia".to_string(),
            description: None,
            location: None,
            image_url: None,
            age: None,
            cost: 0,
            max_participants: None,
            timezone: None,
            start_time: start,
            end_time: start + chrono::Duration::hours(2),
            repeating_event_id: None,
            created_at: start,
            updated_at: start,
        }
    }

    #[tokio::test]
    async fn test_allocation_finds_last_free_id() {
        let store = InMemoryStore::new();
        for id in 0..4 {
            store.add_event(event(id)).await;
        }
        let reserved = Mutex::new(HashSet::new());

        let id = allocate_event_id(&store, 5, 500, &reserved).await.unwrap();

        assert_eq!(id, 4);
        assert!(reserved.lock().await.contains(&4));
    }

    #[tokio::test]
    async fn test_allocation_exhausts_full_space() {
        let store = InMemoryStore::new();
        for id in 0..3 {
            store.add_event(event(id)).await;
        }
        let reserved = Mutex::new(HashSet::new());

        let err = allocate_event_id(&store, 3, 10, &reserved).await.unwrap_err();

        assert!(matches!(err, CoreError::IdSpaceExhausted(10)));
    }

    #[tokio::test]
    async fn test_reserved_ids_are_skipped() {
        let store = InMemoryStore::new();
        let reserved = Mutex::new(HashSet::from([0, 1]));

        let id = allocate_event_id(&store, 3, 500, &reserved).await.unwrap();

        assert_eq!(id, 2);
    }
}
