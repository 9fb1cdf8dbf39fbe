// Session authentication
// Decision: Sessions are issued by the auth provider; this server only resolves them
// Decision: Accept the provider's session cookie (UI) or a Bearer token (API clients)

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde::Serialize;
use socialspot_storage::Database;

/// Cookie names the auth provider uses, plain and `__Secure-` prefixed
pub const SESSION_COOKIES: [&str; 2] = [
    "better-auth.session_token",
    "__Secure-better-auth.session_token",
];

/// Authentication error
#[derive(Debug, Clone, Serialize)]
pub struct AuthError {
    pub error: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl AuthError {
    pub fn unauthorized(message: &str) -> Self {
        Self {
            error: message.to_string(),
            status: StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Authenticated user resolved from a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// Resolves a session token to its user
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> anyhow::Result<Option<AuthUser>>;
}

#[async_trait]
impl SessionResolver for Database {
    async fn resolve(&self, token: &str) -> anyhow::Result<Option<AuthUser>> {
        let row = self.find_session_user(token, Utc::now()).await?;
        Ok(row.map(|row| AuthUser {
            id: row.user_id,
            email: row.email,
            name: row.name,
        }))
    }
}

/// Auth state shared across routes
#[derive(Clone)]
pub struct AuthState {
    pub sessions: Arc<dyn SessionResolver>,
}

impl AuthState {
    pub fn new(sessions: Arc<dyn SessionResolver>) -> Self {
        Self { sessions }
    }
}

/// Extractor for authenticated user
/// This is required - returns 401 if not authenticated
#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        let token = session_token(parts)
            .ok_or_else(|| AuthError::unauthorized("Authentication required"))?;

        auth_state
            .sessions
            .resolve(&token)
            .await
            .map_err(|e| {
                tracing::error!("Failed to resolve session: {}", e);
                AuthError::unauthorized("Failed to validate session")
            })?
            .ok_or_else(|| AuthError::unauthorized("Invalid or expired session"))
    }
}

/// Session token from the Authorization header or the session cookie.
///
/// Cookie values are `token.signature`; only the token part is looked up.
fn session_token(parts: &Parts) -> Option<String> {
    if let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) {
        if let Some(token) = auth_header
            .to_str()
            .ok()
            .and_then(|s| s.strip_prefix("Bearer "))
        {
            return Some(token.trim().to_string()).filter(|t| !t.is_empty());
        }
    }

    let jar = CookieJar::from_headers(&parts.headers);
    SESSION_COOKIES
        .iter()
        .find_map(|name| jar.get(name))
        .and_then(|cookie| cookie.value().split('.').next().map(str::to_string))
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::http::Request;
    use std::collections::HashMap;

    /// Sessions held in a map, for route tests
    #[derive(Default)]
    pub struct StaticSessions(pub HashMap<String, AuthUser>);

    impl StaticSessions {
        pub fn with(token: &str, user_id: &str) -> Arc<Self> {
            let mut map = HashMap::new();
            map.insert(
                token.to_string(),
                AuthUser {
                    id: user_id.to_string(),
                    email: format!("{user_id}@example.com"),
                    name: user_id.to_string(),
                },
            );
            Arc::new(Self(map))
        }
    }

    #[async_trait]
    impl SessionResolver for StaticSessions {
        async fn resolve(&self, token: &str) -> anyhow::Result<Option<AuthUser>> {
            Ok(self.0.get(token).cloned())
        }
    }

    fn parts(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_token_from_cookie_drops_signature() {
        let parts = parts(
            Request::builder()
                .header(header::COOKIE, "theme=dark; better-auth.session_token=abc123.c2lnbmF0dXJl")
                .body(())
                .unwrap(),
        );
        assert_eq!(session_token(&parts).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_token_from_secure_cookie() {
        let parts = parts(
            Request::builder()
                .header(header::COOKIE, "__Secure-better-auth.session_token=xyz.sig")
                .body(())
                .unwrap(),
        );
        assert_eq!(session_token(&parts).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_bearer_header_wins() {
        let parts = parts(
            Request::builder()
                .header(header::AUTHORIZATION, "Bearer header-token")
                .header(header::COOKIE, "better-auth.session_token=cookie.sig")
                .body(())
                .unwrap(),
        );
        assert_eq!(session_token(&parts).as_deref(), Some("header-token"));
    }

    #[tokio::test]
    async fn test_unknown_session_is_rejected() {
        let state = AuthState::new(StaticSessions::with("good", "u1"));
        let mut parts = parts(
            Request::builder()
                .header(header::AUTHORIZATION, "Bearer bad")
                .body(())
                .unwrap(),
        );

        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let mut parts = parts_with_bearer("good");
        let user = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(user.id, "u1");
    }

    fn parts_with_bearer(token: &str) -> Parts {
        parts(
            Request::builder()
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(())
                .unwrap(),
        )
    }
}
