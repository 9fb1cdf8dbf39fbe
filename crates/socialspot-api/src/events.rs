// Event booking HTTP routes

use axum::{
    extract::{FromRef, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use socialspot_core::{Mailer, PaymentGateway, SiteConfig};
use socialspot_storage::Database;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{AuthState, AuthUser};
use crate::common::{ApiError, ErrorResponse};
use crate::services::EventService;

/// App state for event routes
#[derive(Clone, FromRef)]
pub struct AppState {
    pub service: Arc<EventService>,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(
        db: Arc<Database>,
        payments: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn Mailer>,
        site: SiteConfig,
        auth: AuthState,
    ) -> Self {
        Self {
            service: Arc::new(EventService::new(db, payments, mailer, site)),
            auth,
        }
    }
}

/// Amounts in cents
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
    pub amount: i64,
    pub base_cost: i64,
    pub booking_fee: i64,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Required for paid events
    pub payment_intent_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub event_id: i64,
}

/// Create event routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/events/:event_id/payment-intent",
            post(create_payment_intent),
        )
        .route("/v1/events/:event_id/register", post(register))
        .route("/v1/series/:repeating_event_id", get(series_redirect))
        .with_state(state)
}

/// POST /v1/events/{event_id}/payment-intent - Start paying for a booking
#[utoipa::path(
    post,
    path = "/v1/events/{event_id}/payment-intent",
    params(
        ("event_id" = i64, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Payment intent created", body = PaymentIntentResponse),
        (status = 400, description = "Event is free, ended or already booked", body = ErrorResponse),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 500, description = "Failed to create payment intent", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<i64>,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let intent = state.service.payment_intent(event_id, &user.id).await?;

    Ok(Json(PaymentIntentResponse {
        client_secret: intent.client_secret,
        amount: intent.amount,
        base_cost: intent.base_cost,
        booking_fee: intent.booking_fee,
    }))
}

/// POST /v1/events/{event_id}/register - Register the caller
#[utoipa::path(
    post,
    path = "/v1/events/{event_id}/register",
    params(
        ("event_id" = i64, Path, description = "Event ID")
    ),
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registered", body = RegisterResponse),
        (status = 400, description = "Registration rejected", body = ErrorResponse),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 500, description = "Failed to register", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn register(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<i64>,
    body: Option<Json<RegisterRequest>>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let Json(req) = body.unwrap_or_default();
    let event = state
        .service
        .register(event_id, &user.id, req.payment_intent_id.as_deref())
        .await?;

    Ok(Json(RegisterResponse {
        success: true,
        message: "Successfully registered".to_string(),
        event_id: event.event_id,
    }))
}

/// GET /v1/series/{repeating_event_id} - Redirect to the current occurrence
#[utoipa::path(
    get,
    path = "/v1/series/{repeating_event_id}",
    params(
        ("repeating_event_id" = String, Path, description = "Series ID")
    ),
    responses(
        (status = 302, description = "Redirect to the next or latest occurrence"),
        (status = 404, description = "No occurrence in this series", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn series_redirect(
    State(state): State<AppState>,
    Path(repeating_event_id): Path<String>,
) -> Result<Response, ApiError> {
    let redirect = state.service.series_redirect(&repeating_event_id).await?;
    Ok((StatusCode::FOUND, [(header::LOCATION, redirect.location())]).into_response())
}
