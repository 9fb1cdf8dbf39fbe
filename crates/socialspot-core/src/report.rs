// User reports for moderation

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::sanitize::sanitize_optional;

/// Longest accepted report reason, in characters
pub const MAX_REASON_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReport {
    pub reported_by: String,
    pub reported_user_id: String,
    pub reason: String,
}

impl NewReport {
    /// Sanitize and check raw form values; every field is required
    pub fn from_form(
        reported_by: Option<&str>,
        reported_user_id: Option<&str>,
        reason: Option<&str>,
    ) -> Result<Self> {
        let report = Self {
            reported_by: sanitize_optional(reported_by),
            reported_user_id: sanitize_optional(reported_user_id),
            reason: sanitize_optional(reason),
        };
        if report.reported_by.is_empty()
            || report.reported_user_id.is_empty()
            || report.reason.is_empty()
        {
            return Err(CoreError::validation("Missing required fields"));
        }
        if report.reason.chars().count() > MAX_REASON_CHARS {
            return Err(CoreError::validation(format!(
                "Reason must be {MAX_REASON_CHARS} characters or less"
            )));
        }
        if report.reported_by == report.reported_user_id {
            return Err(CoreError::validation("You cannot report yourself"));
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_report() {
        let report = NewReport::from_form(Some("u1"), Some("u2"), Some("<b>spam</b>")).unwrap();
        assert_eq!(report.reason, "spam");
    }

    #[test]
    fn test_missing_fields() {
        let err = NewReport::from_form(Some("u1"), None, Some("spam")).unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields");
        assert!(NewReport::from_form(Some("u1"), Some("u2"), Some("<i></i>")).is_err());
    }

    #[test]
    fn test_self_report_rejected() {
        assert!(NewReport::from_form(Some("u1"), Some("u1"), Some("x")).is_err());
    }
}
