// Chat HTTP routes

use axum::{
    extract::{FromRef, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use socialspot_core::{Broadcaster, Message, ObjectStore};
use socialspot_storage::Database;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::auth::{AuthState, AuthUser};
use crate::common::{ApiError, ErrorResponse, SuccessResponse};
use crate::services::chat::RecentChat;
use crate::services::ChatService;

/// App state for chat routes
#[derive(Clone, FromRef)]
pub struct AppState {
    pub service: Arc<ChatService>,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(
        db: Arc<Database>,
        broadcaster: Arc<dyn Broadcaster>,
        objects: Arc<dyn ObjectStore>,
        auth: AuthState,
    ) -> Self {
        Self {
            service: Arc::new(ChatService::new(db, broadcaster, objects)),
            auth,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver_id: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SendMessageResponse {
    pub success: bool,
    pub message: Message,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase", parameter_in = Query)]
pub struct ConversationQuery {
    pub sender_id: String,
    pub receiver_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub sender_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecentChatDto {
    pub user_id: String,
    pub first_name: String,
    pub last_message: String,
    pub timestamp: DateTime<Utc>,
    /// Presigned link, valid for an hour
    pub profile_picture: Option<String>,
}

impl From<RecentChat> for RecentChatDto {
    fn from(chat: RecentChat) -> Self {
        Self {
            user_id: chat.user_id,
            first_name: chat.first_name,
            last_message: chat.last_message,
            timestamp: chat.timestamp,
            profile_picture: chat.profile_picture,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecentChatsResponse {
    pub chats: Vec<RecentChatDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    pub count: i64,
}

/// Create chat routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/chat/messages",
            post(send_message).get(get_conversation),
        )
        .route("/v1/chat/read", post(mark_read))
        .route("/v1/chat/recent", get(recent_chats))
        .route("/v1/chat/unread-count", get(unread_count))
        .with_state(state)
}

/// POST /v1/chat/messages - Send a direct message
#[utoipa::path(
    post,
    path = "/v1/chat/messages",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Message stored", body = SendMessageResponse),
        (status = 400, description = "Missing required fields", body = ErrorResponse),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Failed to send message", body = ErrorResponse)
    ),
    tag = "chat"
)]
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let message = state
        .service
        .send(&user.id, req.receiver_id.as_deref(), req.content.as_deref())
        .await?;

    Ok(Json(SendMessageResponse {
        success: true,
        message,
    }))
}

/// GET /v1/chat/messages - Conversation between two users, oldest first
#[utoipa::path(
    get,
    path = "/v1/chat/messages",
    params(ConversationQuery),
    responses(
        (status = 200, description = "Conversation", body = ConversationResponse),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Caller is not part of the conversation", body = ErrorResponse),
        (status = 500, description = "Failed to fetch messages", body = ErrorResponse)
    ),
    tag = "chat"
)]
pub async fn get_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ConversationQuery>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let messages = state
        .service
        .conversation(&user.id, &query.sender_id, &query.receiver_id)
        .await?;

    Ok(Json(ConversationResponse { messages }))
}

/// POST /v1/chat/read - Mark a sender's messages to the caller as read
#[utoipa::path(
    post,
    path = "/v1/chat/read",
    request_body = MarkReadRequest,
    responses(
        (status = 200, description = "Marked as read", body = SuccessResponse),
        (status = 400, description = "Missing required fields", body = ErrorResponse),
        (status = 401, description = "Not signed in")
    ),
    tag = "chat"
)]
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<MarkReadRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let updated = state
        .service
        .mark_read(&user.id, req.sender_id.as_deref())
        .await?;
    tracing::debug!(user_id = %user.id, updated, "Messages marked as read");

    Ok(SuccessResponse::ok())
}

/// GET /v1/chat/recent - Latest message with each chat partner
#[utoipa::path(
    get,
    path = "/v1/chat/recent",
    responses(
        (status = 200, description = "Up to five recent chats, newest first", body = RecentChatsResponse),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Failed to fetch recent chats", body = ErrorResponse)
    ),
    tag = "chat"
)]
pub async fn recent_chats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<RecentChatsResponse>, ApiError> {
    let chats = state.service.recent(&user.id).await?;

    Ok(Json(RecentChatsResponse {
        chats: chats.into_iter().map(RecentChatDto::from).collect(),
    }))
}

/// GET /v1/chat/unread-count - Number of users with unread messages for the caller
#[utoipa::path(
    get,
    path = "/v1/chat/unread-count",
    responses(
        (status = 200, description = "Distinct unread senders", body = UnreadCountResponse),
        (status = 401, description = "Not signed in")
    ),
    tag = "chat"
)]
pub async fn unread_count(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let count = state.service.unread_count(&user.id).await?;
    Ok(Json(UnreadCountResponse { count }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tests::StaticSessions;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use socialspot_core::memory::{InMemoryObjectStore, RecordingBroadcaster};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    // The pool is never connected: every request here is settled before a query runs
    fn app() -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/socialspot_unused")
            .unwrap();
        let state = AppState::new(
            Arc::new(Database::new(pool)),
            Arc::new(RecordingBroadcaster::new()),
            Arc::new(InMemoryObjectStore::new()),
            AuthState::new(StaticSessions::with("alice-token", "alice")),
        );
        routes(state)
    }

    #[tokio::test]
    async fn test_requires_session() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/v1/chat/unread-count")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_conversation_of_others_is_forbidden() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/v1/chat/messages?senderId=bob&receiverId=carol")
                    .header(header::AUTHORIZATION, "Bearer alice-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Unauthorized access to messages");
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/chat/messages")
                    .header(header::AUTHORIZATION, "Bearer alice-token")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"receiverId":"bob","content":"<p> </p>"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
