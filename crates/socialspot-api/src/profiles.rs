// Profile HTTP routes (multipart create and edit)

use axum::{
    extract::{DefaultBodyLimit, FromRef, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use socialspot_core::profile::MAX_PHOTO_BYTES;
use socialspot_core::{ObjectStore, Profile, ProfileForm};
use socialspot_storage::Database;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{AuthState, AuthUser};
use crate::common::ApiError;
use crate::services::ProfileService;

/// Room for the text fields and multipart framing around the photo
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// App state for profile routes
#[derive(Clone, FromRef)]
pub struct AppState {
    pub service: Arc<ProfileService>,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(db: Arc<Database>, objects: Arc<dyn ObjectStore>, auth: AuthState) -> Self {
        Self {
            service: Arc::new(ProfileService::new(db, objects)),
            auth,
        }
    }
}

/// Multipart fields accepted by create and edit
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProfileUpload {
    pub first_name: String,
    /// Whole years, 18 to 120
    pub age: String,
    /// JSON array of interest tags
    pub interests: String,
    pub instagram_handle: Option<String>,
    /// JPEG, PNG, WebP or GIF up to 20 MiB; required on create
    #[schema(value_type = Option<String>, format = Binary)]
    pub profile_photo: Option<Vec<u8>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub message: String,
    pub profile: Profile,
}

/// Create profile routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/profile", post(create_profile).put(update_profile))
        .layer(DefaultBodyLimit::max(MAX_PHOTO_BYTES + FORM_OVERHEAD_BYTES))
        .with_state(state)
}

/// Split a profile form into its text fields and the photo bytes
async fn read_form(mut multipart: Multipart) -> Result<(ProfileForm, Option<Vec<u8>>), ApiError> {
    let mut form = ProfileForm::default();
    let mut photo = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid form data: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "profile_photo" {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Invalid form data: {e}")))?;
            // Browsers send an empty part when no file was picked
            if !bytes.is_empty() {
                photo = Some(bytes.to_vec());
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid form data: {e}")))?;
        match name.as_str() {
            "first_name" => form.first_name = Some(value),
            "age" => form.age = Some(value),
            "interests" => form.interests = Some(value),
            "instagram_handle" => form.instagram_handle = Some(value),
            _ => {}
        }
    }

    Ok((form, photo))
}

/// POST /v1/profile - Create the caller's profile
#[utoipa::path(
    post,
    path = "/v1/profile",
    request_body(content = ProfileUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Profile created", body = ProfileResponse),
        (status = 400, description = "Invalid form data", body = crate::common::ErrorResponse),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Internal server error")
    ),
    tag = "profiles"
)]
pub async fn create_profile(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ProfileResponse>), ApiError> {
    let (form, photo) = read_form(multipart).await?;
    let profile = state
        .service
        .create(&user.id, &form, photo.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ProfileResponse {
            message: "Profile created successfully".to_string(),
            profile,
        }),
    ))
}

/// PUT /v1/profile - Edit the caller's profile
#[utoipa::path(
    put,
    path = "/v1/profile",
    request_body(content = ProfileUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Invalid form data", body = crate::common::ErrorResponse),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Profile update failed")
    ),
    tag = "profiles"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<Json<ProfileResponse>, ApiError> {
    let (form, photo) = read_form(multipart).await?;
    let profile = state
        .service
        .update(&user.id, &form, photo.as_deref())
        .await?;

    Ok(Json(ProfileResponse {
        message: "Profile updated successfully".to_string(),
        profile,
    }))
}
