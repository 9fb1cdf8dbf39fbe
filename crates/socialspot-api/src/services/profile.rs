// Profile service: create and edit profiles, store the normalized photo

use std::sync::Arc;

use socialspot_core::profile::{profile_picture_key, PROFILE_PICTURE_BUCKET};
use socialspot_core::{ObjectStore, Profile, ProfileFields, ProfileForm};
use socialspot_storage::{Database, UpsertProfile};

use super::photo::prepare_profile_photo;
use crate::common::ApiError;

pub struct ProfileService {
    db: Arc<Database>,
    objects: Arc<dyn ObjectStore>,
}

impl ProfileService {
    pub fn new(db: Arc<Database>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { db, objects }
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<Profile>, ApiError> {
        let row = self
            .db
            .get_profile(user_id)
            .await
            .map_err(|e| ApiError::internal("Failed to load profile", e))?;
        Ok(row.map(Profile::from))
    }

    /// Create the caller's profile. A photo is required.
    pub async fn create(
        &self,
        user_id: &str,
        form: &ProfileForm,
        photo: Option<&[u8]>,
    ) -> Result<Profile, ApiError> {
        let fields = form.validate()?;
        let photo = photo.ok_or_else(|| ApiError::bad_request("Please upload a valid image file"))?;
        let jpeg = prepare_profile_photo(photo)?;

        if self.get(user_id).await?.is_some() {
            return Err(ApiError::bad_request("Profile already exists"));
        }

        let row = self
            .db
            .create_profile(upsert(user_id, fields))
            .await
            .map_err(|e| ApiError::internal("Internal server error", e))?;
        tracing::info!(user_id, "Profile created");

        self.upload_photo(user_id, jpeg).await;
        Ok(row.into())
    }

    /// Update the caller's profile; the photo is replaced only when one is sent
    pub async fn update(
        &self,
        user_id: &str,
        form: &ProfileForm,
        photo: Option<&[u8]>,
    ) -> Result<Profile, ApiError> {
        let fields = form.validate()?;
        let jpeg = photo.map(prepare_profile_photo).transpose()?;

        let row = self
            .db
            .update_profile(upsert(user_id, fields))
            .await
            .map_err(|e| ApiError::internal("Internal server error", e))?
            .ok_or_else(|| {
                ApiError::internal(
                    "Profile update failed",
                    anyhow::anyhow!("no profile row for user {user_id}"),
                )
            })?;

        if let Some(jpeg) = jpeg {
            self.upload_photo(user_id, jpeg).await;
        }
        Ok(row.into())
    }

    // The profile row is already committed; a failed upload leaves the old picture
    async fn upload_photo(&self, user_id: &str, jpeg: Vec<u8>) {
        let key = profile_picture_key(user_id);
        match self
            .objects
            .put_object(PROFILE_PICTURE_BUCKET, &key, jpeg, "image/jpeg")
            .await
        {
            Ok(()) => tracing::debug!(user_id, key = %key, "Profile photo uploaded"),
            Err(e) => tracing::error!(user_id, error = %e, "Failed to upload profile photo"),
        }
    }
}

fn upsert(user_id: &str, fields: ProfileFields) -> UpsertProfile {
    UpsertProfile {
        user_id: user_id.to_string(),
        first_name: fields.first_name,
        age: fields.age,
        interests: fields.interests,
        instagram_handle: fields.instagram_handle,
    }
}
