// User report HTTP routes

use axum::{extract::{FromRef, State}, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use socialspot_core::{Mailer, SiteConfig};
use socialspot_storage::Database;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{AuthState, AuthUser};
use crate::common::{ApiError, ErrorResponse};
use crate::services::ReportService;

/// App state for report routes
#[derive(Clone, FromRef)]
pub struct AppState {
    pub service: Arc<ReportService>,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(db: Arc<Database>, mailer: Arc<dyn Mailer>, site: SiteConfig, auth: AuthState) -> Self {
        Self {
            service: Arc::new(ReportService::new(db, mailer, site)),
            auth,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    /// Must be the caller
    pub reported_by: Option<String>,
    pub report_user_id: Option<String>,
    pub report_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportResponse {
    pub success: bool,
    pub message: String,
}

/// Create report routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/reports", post(submit_report))
        .with_state(state)
}

/// POST /v1/reports - Report another user to the moderators
#[utoipa::path(
    post,
    path = "/v1/reports",
    request_body = ReportRequest,
    responses(
        (status = 200, description = "Report submitted", body = ReportResponse),
        (status = 400, description = "Missing required fields", body = ErrorResponse),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Reporter is not the caller", body = ErrorResponse),
        (status = 500, description = "Failed to submit report", body = ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn submit_report(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ReportRequest>,
) -> Result<Json<ReportResponse>, ApiError> {
    let report_id = state
        .service
        .submit(
            &user.id,
            req.reported_by.as_deref(),
            req.report_user_id.as_deref(),
            req.report_reason.as_deref(),
        )
        .await?;
    tracing::info!(report_id, reported_by = %user.id, "Report submitted");

    Ok(Json(ReportResponse {
        success: true,
        message: "Report submitted successfully".to_string(),
    }))
}
