// Job trigger HTTP routes
// Decision: An external cron may drive the jobs instead of the worker scheduler
// Decision: When JOBS_TRIGGER_TOKEN is set, callers must send it as a Bearer token

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use socialspot_worker::{JobKind, Jobs};
use std::sync::Arc;

use crate::common::ErrorResponse;

/// App state for job trigger routes
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<Jobs>,
    pub trigger_token: Option<String>,
}

impl AppState {
    pub fn new(jobs: Arc<Jobs>, trigger_token: Option<String>) -> Self {
        Self {
            jobs,
            trigger_token: trigger_token.filter(|t| !t.is_empty()),
        }
    }

    /// Token from `JOBS_TRIGGER_TOKEN`; unset leaves the triggers open
    pub fn from_env(jobs: Arc<Jobs>) -> Self {
        Self::new(jobs, std::env::var("JOBS_TRIGGER_TOKEN").ok())
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.trigger_token else {
            return true;
        };
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token.trim() == expected)
    }
}

/// Create job trigger routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/jobs/:job", post(trigger_job))
        .with_state(state)
}

fn error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// POST /v1/jobs/{job} - Run one job invocation now
#[utoipa::path(
    post,
    path = "/v1/jobs/{job}",
    params(
        ("job" = String, Path, description = "recreate-events, send-event-reminder, send-event-followup, send-message-notifications or backup-database")
    ),
    responses(
        (status = 200, description = "Job completed, skipped or had nothing to do"),
        (status = 401, description = "Missing or wrong trigger token", body = ErrorResponse),
        (status = 404, description = "Unknown job", body = ErrorResponse),
        (status = 500, description = "Job aborted", body = ErrorResponse)
    ),
    tag = "jobs"
)]
pub async fn trigger_job(
    State(state): State<AppState>,
    Path(job): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !state.authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let Ok(kind) = job.parse::<JobKind>() else {
        return error(StatusCode::NOT_FOUND, "Unknown job");
    };

    tracing::info!(job = %kind, "Job triggered over HTTP");
    let response = state.jobs.run(kind, Utc::now()).await;
    let status =
        StatusCode::from_u16(response.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (status, Json(response)).into_response()
}
