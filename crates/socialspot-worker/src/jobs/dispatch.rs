// Send-then-mark delivery shared by the email jobs
//
// The email goes out first and the marker is written second, as two separate
// calls. A crash between them means a duplicate email on the next run, never a
// marker for an email that was not sent.

use std::future::Future;

use socialspot_core::{Email, Mailer, Result};
use tracing::{debug, error};

use crate::report::DispatchOutcome;

pub(super) async fn send_then_mark<F, Fut>(
    mailer: &dyn Mailer,
    email: &Email,
    user_id: &str,
    event_id: Option<i64>,
    mark: F,
) -> DispatchOutcome
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    if let Err(e) = mailer.send(email).await {
        error!(user_id, event_id, error = %e, "Failed to send email");
        return DispatchOutcome::failed(user_id, event_id, e);
    }
    debug!(user_id, event_id, subject = %email.subject, "Email sent");

    match mark().await {
        Ok(()) => DispatchOutcome::sent(user_id, event_id),
        Err(e) => {
            error!(user_id, event_id, error = %e, "Email sent but marker not recorded");
            DispatchOutcome::failed(user_id, event_id, e)
        }
    }
}
