// SocialSpot API server
// Decision: Profiles, booking, chat, matches and reports behind one session-authenticated router
// Decision: Job triggers share the worker's Jobs so an external cron can replace the scheduler

mod auth;
mod chat;
mod common;
mod events;
mod jobs;
mod matches;
mod og;
mod profiles;
mod reports;
mod services;

use anyhow::{Context, Result};
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::{routing::get, Json, Router};
use serde::Serialize;
use socialspot_core::{Message, Profile};
use socialspot_providers::{PusherBroadcaster, PusherConfig, StripeConfig, StripeGateway};
use socialspot_storage::Database;
use socialspot_worker::{dependencies_from_env, Jobs, WorkerConfig};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        profiles::create_profile,
        profiles::update_profile,
        events::create_payment_intent,
        events::register,
        events::series_redirect,
        chat::send_message,
        chat::get_conversation,
        chat::mark_read,
        chat::recent_chats,
        chat::unread_count,
        matches::request_match,
        matches::delete_match,
        reports::submit_report,
        og::default_card,
        jobs::trigger_job,
    ),
    components(
        schemas(
            Profile, Message,
            common::ErrorResponse, common::SuccessResponse,
            profiles::ProfileUpload, profiles::ProfileResponse,
            events::PaymentIntentResponse, events::RegisterRequest, events::RegisterResponse,
            chat::SendMessageRequest, chat::SendMessageResponse,
            chat::ConversationResponse, chat::MarkReadRequest,
            chat::RecentChatDto, chat::RecentChatsResponse, chat::UnreadCountResponse,
            matches::MatchRequest, matches::DeleteMatchRequest, matches::MatchResponse,
            reports::ReportRequest, reports::ReportResponse,
        )
    ),
    tags(
        (name = "profiles", description = "Profile creation and editing"),
        (name = "events", description = "Event booking and series links"),
        (name = "chat", description = "Direct messages between attendees"),
        (name = "matches", description = "Connections between attendees"),
        (name = "reports", description = "User reports for moderation"),
        (name = "og", description = "Social share images"),
        (name = "jobs", description = "Scheduled job triggers")
    ),
    info(
        title = "SocialSpot API",
        version = "0.1.0",
        description = "API for profiles, event booking, chat, connections and scheduled jobs"
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "socialspot_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("socialspot-api starting...");

    // Initialize database
    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL environment variable required")?;
    let db = Database::from_url(&database_url)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to run migrations")?;
    tracing::info!("Connected to database");

    // Providers shared by the routes and the job triggers
    let deps = dependencies_from_env(&db)?;
    let payments = Arc::new(
        StripeGateway::new(StripeConfig::from_env()?).context("Failed to create Stripe client")?,
    );
    let broadcaster = Arc::new(
        PusherBroadcaster::new(PusherConfig::from_env()?)
            .context("Failed to create Pusher client")?,
    );

    let worker_config = WorkerConfig::from_env().context("Invalid worker configuration")?;
    let site = worker_config.site.clone();
    tracing::info!(site = %site.base_url, series_match = ?worker_config.series_match, "Configuration loaded");
    let jobs = Arc::new(Jobs::new(deps.clone(), worker_config));

    let db = Arc::new(db);
    let auth_state = auth::AuthState::new(db.clone());

    // Create module-specific states
    let profiles_state =
        profiles::AppState::new(db.clone(), deps.objects.clone(), auth_state.clone());
    let events_state = events::AppState::new(
        db.clone(),
        payments,
        deps.mailer.clone(),
        site.clone(),
        auth_state.clone(),
    );
    let chat_state = chat::AppState::new(
        db.clone(),
        broadcaster,
        deps.objects.clone(),
        auth_state.clone(),
    );
    let matches_state =
        matches::AppState::new(db.clone(), deps.mailer.clone(), site.clone(), auth_state.clone());
    let reports_state =
        reports::AppState::new(db.clone(), deps.mailer.clone(), site, auth_state);
    let jobs_state = jobs::AppState::from_env(jobs);
    if jobs_state.trigger_token.is_none() {
        tracing::warn!("JOBS_TRIGGER_TOKEN not set, job triggers are unauthenticated");
    }

    // Load API prefix from environment (default: empty)
    // Example: API_PREFIX="/api" results in routes like /api/v1/profile
    let api_prefix = std::env::var("API_PREFIX").unwrap_or_default();
    if !api_prefix.is_empty() {
        tracing::info!(prefix = %api_prefix, "API prefix configured");
    }

    // Load CORS allowed origins from environment (optional)
    // Example: CORS_ALLOWED_ORIGINS="https://socialspot.com.au,https://www.socialspot.com.au"
    let cors_origins: Vec<HeaderValue> = std::env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect()
        })
        .unwrap_or_default();

    if cors_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
    } else {
        tracing::info!(origins = ?cors_origins, "CORS origins configured");
    }

    let api_routes = Router::new()
        .merge(profiles::routes(profiles_state))
        .merge(events::routes(events_state))
        .merge(chat::routes(chat_state))
        .merge(matches::routes(matches_state))
        .merge(reports::routes(reports_state))
        .merge(og::routes())
        .merge(jobs::routes(jobs_state));

    let app = Router::new()
        .route("/health", get(health))
        .merge(build_router_with_prefix(api_routes, &api_prefix))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    // Add CORS layer only if origins are configured
    let app = if !cors_origins.is_empty() {
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::AUTHORIZATION,
                    header::ACCEPT,
                    header::ORIGIN,
                    header::CACHE_CONTROL,
                ])
                .allow_credentials(true),
        )
    } else {
        app
    };

    let app = with_security_headers(app).layer(TraceLayer::new_for_http());

    // Start server
    let addr = "0.0.0.0:9000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Build router with optional API prefix (extracted for testing)
fn build_router_with_prefix<S: Clone + Send + Sync + 'static>(
    api_routes: Router<S>,
    api_prefix: &str,
) -> Router<S> {
    if api_prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(api_prefix, api_routes)
    }
}

/// Headers sent with every response
fn with_security_headers(app: Router) -> Router {
    let headers: [(HeaderName, &'static str); 4] = [
        (header::X_FRAME_OPTIONS, "DENY"),
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
        (
            header::STRICT_TRANSPORT_SECURITY,
            "max-age=31536000; includeSubDomains",
        ),
    ];
    headers.into_iter().fold(app, |app, (name, value)| {
        app.layer(SetResponseHeaderLayer::overriding(
            name,
            HeaderValue::from_static(value),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_routes() -> Router {
        Router::new().route("/v1/test", get(|| async { "ok" }))
    }

    #[tokio::test]
    async fn test_api_prefix_empty() {
        let app = build_router_with_prefix(test_routes(), "");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_api_prefix_set() {
        let app = build_router_with_prefix(test_routes(), "/api");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 200);

        // Route should NOT work without prefix
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_security_headers() {
        let app = with_security_headers(test_routes());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    }

    #[test]
    fn test_openapi_lists_job_trigger() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/v1/jobs/{job}"));
        assert!(doc.paths.paths.contains_key("/v1/profile"));
    }
}
