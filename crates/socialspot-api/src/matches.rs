// Connection (match) HTTP routes

use axum::{extract::{FromRef, State}, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use socialspot_core::{Mailer, SiteConfig};
use socialspot_storage::Database;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{AuthState, AuthUser};
use crate::common::{ApiError, ErrorResponse};
use crate::services::MatchService;

/// App state for match routes
#[derive(Clone, FromRef)]
pub struct AppState {
    pub service: Arc<MatchService>,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(db: Arc<Database>, mailer: Arc<dyn Mailer>, site: SiteConfig, auth: AuthState) -> Self {
        Self {
            service: Arc::new(MatchService::new(db, mailer, site)),
            auth,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MatchRequest {
    /// The attendee to connect with
    pub user_id_2: Option<String>,
    pub event_id: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteMatchRequest {
    pub user_id_2: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MatchResponse {
    /// `matched`, `already_exists`, `pending` or `success`
    pub status: String,
    pub message: String,
}

/// Create match routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/matches", post(request_match))
        .route("/v1/matches/delete", post(delete_match))
        .with_state(state)
}

/// POST /v1/matches - Ask to connect with another attendee
#[utoipa::path(
    post,
    path = "/v1/matches",
    request_body = MatchRequest,
    responses(
        (status = 200, description = "Request recorded or accepted", body = MatchResponse),
        (status = 400, description = "Missing required fields", body = ErrorResponse),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "matches"
)]
pub async fn request_match(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, ApiError> {
    let outcome = state
        .service
        .request(&user.id, req.user_id_2.as_deref(), req.event_id)
        .await?;

    Ok(Json(MatchResponse {
        status: outcome.status().to_string(),
        message: outcome.message().to_string(),
    }))
}

/// POST /v1/matches/delete - Remove a connection
#[utoipa::path(
    post,
    path = "/v1/matches/delete",
    request_body = DeleteMatchRequest,
    responses(
        (status = 200, description = "Connection removed", body = MatchResponse),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Match not found or already deleted", body = ErrorResponse)
    ),
    tag = "matches"
)]
pub async fn delete_match(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<DeleteMatchRequest>,
) -> Result<Json<MatchResponse>, ApiError> {
    state
        .service
        .delete(&user.id, req.user_id_2.as_deref())
        .await?;

    Ok(Json(MatchResponse {
        status: "success".to_string(),
        message: "Match deleted successfully".to_string(),
    }))
}
