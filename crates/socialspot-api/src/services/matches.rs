// Match service: connection requests between attendees

use std::sync::Arc;

use chrono::Utc;
use socialspot_core::email::connection_accepted;
use socialspot_core::matches::decide;
use socialspot_core::sanitize::sanitize_optional;
use socialspot_core::{Mailer, Match, MatchDecision, SiteConfig};
use socialspot_storage::{Database, MatchRow};

use crate::common::ApiError;

/// Result of a connection request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The counterpart had already asked: both are connected now
    Matched,
    AlreadyExists,
    Pending,
}

impl MatchOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            MatchOutcome::Matched => "matched",
            MatchOutcome::AlreadyExists => "already_exists",
            MatchOutcome::Pending => "pending",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            MatchOutcome::Matched => "You're now connected!",
            MatchOutcome::AlreadyExists => "Connection request already sent",
            MatchOutcome::Pending => "Connection request sent",
        }
    }
}

pub struct MatchService {
    db: Arc<Database>,
    mailer: Arc<dyn Mailer>,
    site: SiteConfig,
}

impl MatchService {
    pub fn new(db: Arc<Database>, mailer: Arc<dyn Mailer>, site: SiteConfig) -> Self {
        Self { db, mailer, site }
    }

    /// Ask to connect with `counterpart` met at `event_id`
    pub async fn request(
        &self,
        caller: &str,
        counterpart: Option<&str>,
        event_id: Option<i64>,
    ) -> Result<MatchOutcome, ApiError> {
        let counterpart = sanitize_optional(counterpart);
        let event_id = match event_id {
            Some(id) if !counterpart.is_empty() => id,
            _ => return Err(ApiError::bad_request("Missing required fields")),
        };
        if counterpart == caller {
            return Err(ApiError::bad_request("You cannot connect with yourself"));
        }

        let existing = self
            .db
            .find_connection(caller, &counterpart, event_id)
            .await
            .map_err(|e| ApiError::internal("Internal server error", e))?
            .map(Match::try_from)
            .transpose()?;

        match decide(existing.as_ref(), caller) {
            MatchDecision::CreatePending => {
                self.db
                    .create_pending_match(caller, &counterpart, event_id)
                    .await
                    .map_err(|e| ApiError::internal("Internal server error", e))?;
                tracing::info!(caller, counterpart = %counterpart, event_id, "Connection requested");
                Ok(MatchOutcome::Pending)
            }
            MatchDecision::Accept(match_id) => {
                let accepted = self
                    .db
                    .accept_match(match_id, Utc::now())
                    .await
                    .map_err(|e| ApiError::internal("Internal server error", e))?;
                match accepted {
                    Some(row) => {
                        tracing::info!(match_id, event_id, "Connection accepted");
                        self.notify_requester(caller, row);
                        Ok(MatchOutcome::Matched)
                    }
                    // Accepted concurrently by another request
                    None => Ok(MatchOutcome::AlreadyExists),
                }
            }
            MatchDecision::AlreadyExists => Ok(MatchOutcome::AlreadyExists),
        }
    }

    // Emails the user who asked first; failures are only logged
    fn notify_requester(&self, accepter: &str, row: MatchRow) {
        let db = self.db.clone();
        let mailer = self.mailer.clone();
        let site = self.site.clone();
        let accepter = accepter.to_string();

        tokio::spawn(async move {
            let lookup = async {
                let requester = db.get_user_contact(&row.user_id_1).await?;
                let accepter = db.get_user_contact(&accepter).await?;
                let event = db.get_event(row.event_id).await?;
                anyhow::Ok((requester, accepter, event))
            };
            let (requester, accepter, event) = match lookup.await {
                Ok((Some(requester), accepter, event)) => (requester, accepter, event),
                Ok((None, _, _)) => {
                    tracing::warn!(match_id = row.id, "Requester has no contact details");
                    return;
                }
                Err(e) => {
                    tracing::error!(match_id = row.id, error = %e, "Failed to load connection details");
                    return;
                }
            };

            let connected_with = accepter
                .and_then(|c| c.first_name)
                .unwrap_or_else(|| "Someone".to_string());
            let event_name = event.map(|e| e.name).unwrap_or_else(|| "SocialSpot".to_string());
            let email = connection_accepted(&site, &requester.email, &connected_with, &event_name);
            if let Err(e) = mailer.send(&email).await {
                tracing::error!(match_id = row.id, error = %e, "Failed to send connection email");
            }
        });
    }

    /// Remove a connection and mark everything between the pair as read
    pub async fn delete(&self, caller: &str, counterpart: Option<&str>) -> Result<(), ApiError> {
        let counterpart = sanitize_optional(counterpart);
        if counterpart.is_empty() {
            return Err(ApiError::bad_request("Missing required fields"));
        }

        let matched = self
            .db
            .find_matched(caller, &counterpart)
            .await
            .map_err(|e| ApiError::internal("Internal server error", e))?
            .ok_or_else(|| ApiError::not_found("Match not found or already deleted"))?;

        self.db
            .mark_pair_read(caller, &counterpart)
            .await
            .map_err(|e| ApiError::internal("Internal server error", e))?;
        self.db
            .delete_match(matched.id)
            .await
            .map_err(|e| ApiError::internal("Internal server error", e))?;

        tracing::info!(match_id = matched.id, caller, "Connection deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_wording() {
        assert_eq!(MatchOutcome::Matched.status(), "matched");
        assert_eq!(MatchOutcome::Matched.message(), "You're now connected!");
        assert_eq!(MatchOutcome::AlreadyExists.status(), "already_exists");
        assert_eq!(MatchOutcome::Pending.message(), "Connection request sent");
    }
}
