// Event reminders (a day before) and follow-ups (an hour after)

use chrono::{DateTime, Utc};
use futures::future::join_all;
use socialspot_core::email::{event_followup, event_reminder};
use socialspot_core::{Email, Milestone, ParticipantRecipient, Result, TimeWindow};
use tracing::info;

use super::dispatch::send_then_mark;
use super::Jobs;
use crate::report::JobResponse;

fn window_for(milestone: Milestone, now: DateTime<Utc>) -> TimeWindow {
    match milestone {
        Milestone::Reminder => TimeWindow::reminder(now),
        Milestone::Followup => TimeWindow::followup(now),
    }
}

fn nothing_to_send(milestone: Milestone) -> &'static str {
    match milestone {
        Milestone::Reminder => "No reminders to send",
        Milestone::Followup => "No emails to send",
    }
}

fn render(jobs: &Jobs, milestone: Milestone, recipient: &ParticipantRecipient) -> Email {
    let site = &jobs.config.site;
    match milestone {
        Milestone::Reminder => event_reminder(
            site,
            &recipient.email,
            &recipient.first_name,
            recipient.event_id,
            &recipient.event_name,
            recipient.location.as_deref(),
            recipient.start_time,
        ),
        Milestone::Followup => event_followup(
            site,
            &recipient.email,
            &recipient.first_name,
            recipient.event_id,
            &recipient.event_name,
        ),
    }
}

pub(super) async fn run(
    jobs: &Jobs,
    milestone: Milestone,
    now: DateTime<Utc>,
) -> Result<JobResponse> {
    let window = window_for(milestone, now);
    let recipients = jobs
        .deps
        .milestones
        .pending_recipients(milestone, &window, jobs.config.batch_limit)
        .await?;

    info!(
        ?milestone,
        count = recipients.len(),
        start = %window.start,
        end = %window.end,
        "Selected recipients"
    );
    if recipients.is_empty() {
        return Ok(JobResponse::nothing_to_do(
            nothing_to_send(milestone),
            Some(window),
        ));
    }

    let results = join_all(recipients.iter().map(|recipient| {
        let email = render(jobs, milestone, recipient);
        async move {
            send_then_mark(
                jobs.deps.mailer.as_ref(),
                &email,
                &recipient.user_id,
                Some(recipient.event_id),
                || {
                    jobs.deps
                        .milestones
                        .mark_sent(milestone, recipient.event_id, &recipient.user_id)
                },
            )
            .await
        }
    }))
    .await;

    Ok(JobResponse::completed(results, Some(window)))
}
