// Report service: user reports forwarded to moderation

use std::sync::Arc;

use socialspot_core::email::report_submitted;
use socialspot_core::{Mailer, NewReport, SiteConfig};
use socialspot_storage::Database;

use crate::common::ApiError;

pub struct ReportService {
    db: Arc<Database>,
    mailer: Arc<dyn Mailer>,
    site: SiteConfig,
}

impl ReportService {
    pub fn new(db: Arc<Database>, mailer: Arc<dyn Mailer>, site: SiteConfig) -> Self {
        Self { db, mailer, site }
    }

    /// Store a report filed by the caller and alert the moderators.
    ///
    /// Unlike other notifications the moderation email is part of the request:
    /// if it cannot be sent the caller is told the report failed.
    pub async fn submit(
        &self,
        caller: &str,
        reported_by: Option<&str>,
        reported_user_id: Option<&str>,
        reason: Option<&str>,
    ) -> Result<i64, ApiError> {
        let report = NewReport::from_form(reported_by, reported_user_id, reason)?;
        if report.reported_by != caller {
            return Err(ApiError::forbidden("You can only submit reports as yourself"));
        }

        let row = self
            .db
            .create_report(&report.reported_by, &report.reported_user_id, &report.reason)
            .await
            .map_err(|e| ApiError::internal("Failed to submit report", e))?;
        tracing::info!(
            report_id = row.id,
            reported_user_id = %row.reported_user_id,
            "Report stored"
        );

        let email = report_submitted(
            &self.site,
            &report.reported_by,
            &report.reported_user_id,
            &report.reason,
        );
        self.mailer
            .send(&email)
            .await
            .map_err(|e| ApiError::internal("Failed to submit report", e))?;

        Ok(row.id)
    }
}
