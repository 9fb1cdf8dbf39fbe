// Job run summaries returned to the scheduler or the HTTP trigger

use serde::Serialize;
use socialspot_core::TimeWindow;

pub const INTERNAL_ERROR: &str = "Internal server error";
pub const ALREADY_RUNNING: &str = "Job already running";

/// Outcome of recreating one occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecreationOutcome {
    pub success: bool,
    pub original_event_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_event_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecreationOutcome {
    pub fn created(original_event_id: i64, new_event_id: i64) -> Self {
        Self {
            success: true,
            original_event_id,
            new_event_id: Some(new_event_id),
            error: None,
        }
    }

    pub fn failed(original_event_id: i64, error: impl ToString) -> Self {
        Self {
            success: false,
            original_event_id,
            new_event_id: None,
            error: Some(error.to_string()),
        }
    }
}

/// Outcome of emailing one recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub success: bool,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchOutcome {
    pub fn sent(user_id: &str, event_id: Option<i64>) -> Self {
        Self {
            success: true,
            user_id: user_id.to_string(),
            event_id,
            error: None,
        }
    }

    pub fn failed(user_id: &str, event_id: Option<i64>, error: impl ToString) -> Self {
        Self {
            success: false,
            user_id: user_id.to_string(),
            event_id,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ItemOutcome {
    Recreation(RecreationOutcome),
    Dispatch(DispatchOutcome),
}

impl ItemOutcome {
    pub fn success(&self) -> bool {
        match self {
            ItemOutcome::Recreation(o) => o.success,
            ItemOutcome::Dispatch(o) => o.success,
        }
    }
}

impl From<RecreationOutcome> for ItemOutcome {
    fn from(outcome: RecreationOutcome) -> Self {
        ItemOutcome::Recreation(outcome)
    }
}

impl From<DispatchOutcome> for ItemOutcome {
    fn from(outcome: DispatchOutcome) -> Self {
        ItemOutcome::Dispatch(outcome)
    }
}

/// Body of a job response. The HTTP status comes from [`JobResponse::http_status`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JobResponse {
    /// Every candidate was attempted; `success` is true even with per-item failures
    Completed {
        success: bool,
        processed: usize,
        results: Vec<ItemOutcome>,
        #[serde(rename = "timeRange", skip_serializing_if = "Option::is_none")]
        time_range: Option<TimeWindow>,
    },
    /// Nothing to do, or another run holds the lease
    Skipped {
        message: String,
        #[serde(rename = "timeRange", skip_serializing_if = "Option::is_none")]
        time_range: Option<TimeWindow>,
    },
    /// A backup file was written
    BackedUp { message: String, file: String },
    /// The run aborted before per-item processing
    Failed {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
}

impl JobResponse {
    pub fn completed<T: Into<ItemOutcome>>(results: Vec<T>, time_range: Option<TimeWindow>) -> Self {
        let results: Vec<ItemOutcome> = results.into_iter().map(Into::into).collect();
        JobResponse::Completed {
            success: true,
            processed: results.len(),
            results,
            time_range,
        }
    }

    pub fn nothing_to_do(message: &str, time_range: Option<TimeWindow>) -> Self {
        JobResponse::Skipped {
            message: message.to_string(),
            time_range,
        }
    }

    pub fn already_running() -> Self {
        JobResponse::Skipped {
            message: ALREADY_RUNNING.to_string(),
            time_range: None,
        }
    }

    pub fn internal_error() -> Self {
        JobResponse::Failed {
            error: INTERNAL_ERROR.to_string(),
            details: None,
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            JobResponse::Failed { .. } => 500,
            _ => 200,
        }
    }

    /// Per-item results, empty unless the run completed
    pub fn results(&self) -> &[ItemOutcome] {
        match self {
            JobResponse::Completed { results, .. } => results,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_completed_serialization() {
        let window = TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 12, 14, 14, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 12, 14, 15, 0, 0).unwrap(),
        );
        let response = JobResponse::completed(
            vec![
                RecreationOutcome::created(1, 2),
                RecreationOutcome::failed(3, "Invalid time sequence"),
            ],
            Some(window),
        );

        assert_eq!(response.http_status(), 200);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "success": true,
                "processed": 2,
                "results": [
                    {"success": true, "originalEventId": 1, "newEventId": 2},
                    {"success": false, "originalEventId": 3, "error": "Invalid time sequence"}
                ],
                "timeRange": {
                    "startTime": "2024-12-14T14:00:00Z",
                    "endTime": "2024-12-14T15:00:00Z"
                }
            })
        );
    }

    #[test]
    fn test_nothing_to_do_without_window() {
        let response = JobResponse::nothing_to_do("No notifications to send", None);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"message": "No notifications to send"})
        );
    }

    #[test]
    fn test_internal_error_is_500() {
        let response = JobResponse::internal_error();
        assert_eq!(response.http_status(), 500);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"error": "Internal server error"})
        );
    }
}
