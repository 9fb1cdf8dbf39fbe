// Unread-message email digests

use chrono::{DateTime, Utc};
use futures::future::join_all;
use socialspot_core::email::unread_messages;
use socialspot_core::{DigestWindow, Result};
use tracing::info;

use super::dispatch::send_then_mark;
use super::Jobs;
use crate::report::JobResponse;

pub(super) async fn run(jobs: &Jobs, now: DateTime<Utc>) -> Result<JobResponse> {
    let window = DigestWindow::at(now);
    let digests = jobs
        .deps
        .digests
        .pending_digests(&window, jobs.config.batch_limit)
        .await?;

    info!(
        count = digests.len(),
        lookback_from = %window.lookback_from,
        settled_before = %window.settled_before,
        "Selected digest recipients"
    );
    if digests.is_empty() {
        return Ok(JobResponse::nothing_to_do("No notifications to send", None));
    }

    let results = join_all(digests.iter().map(|digest| {
        let email = unread_messages(
            &jobs.config.site,
            &digest.email,
            &digest.first_name,
            digest.unique_senders,
            &digest.sender_names,
        );
        async move {
            send_then_mark(
                jobs.deps.mailer.as_ref(),
                &email,
                &digest.user_id,
                None,
                || {
                    jobs.deps
                        .digests
                        .mark_notified(&digest.user_id, &digest.message_ids)
                },
            )
            .await
        }
    }))
    .await;

    Ok(JobResponse::completed(results, None))
}
