// Profile validation rules
//
// Profiles are created and edited through multipart forms; every field is
// validated here before it reaches the database or object storage.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::{CoreError, Result};
use crate::sanitize::sanitize_input;

pub const MAX_FIRST_NAME_CHARS: usize = 25;
pub const MIN_AGE: i32 = 18;
pub const MAX_AGE: i32 = 120;

/// Largest accepted profile photo upload
pub const MAX_PHOTO_BYTES: usize = 20 * 1024 * 1024;

/// Photos are scaled to fit inside this square before upload
pub const PHOTO_MAX_DIMENSION: u32 = 800;
pub const PHOTO_JPEG_QUALITY: u8 = 80;

pub const PROFILE_PICTURE_BUCKET: &str = "profile-pictures";

pub const ALLOWED_PHOTO_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Profile {
    pub user_id: String,
    pub first_name: String,
    pub age: i32,
    /// JSON array of interest tags
    pub interests: serde_json::Value,
    pub instagram_handle: Option<String>,
}

/// Validated form fields shared by create and edit
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileFields {
    pub first_name: String,
    pub age: i32,
    /// Normalized JSON text of the interests array
    pub interests: String,
    pub instagram_handle: Option<String>,
}

/// Raw form values as they arrive from the client
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub first_name: Option<String>,
    pub age: Option<String>,
    pub interests: Option<String>,
    pub instagram_handle: Option<String>,
}

impl ProfileForm {
    pub fn validate(&self) -> Result<ProfileFields> {
        let first_name = validate_first_name(self.first_name.as_deref().unwrap_or_default())?;
        let age = validate_age(self.age.as_deref().unwrap_or_default())?;
        let interests = validate_interests(self.interests.as_deref().unwrap_or_default())?;
        let instagram_handle = match self.instagram_handle.as_deref().map(sanitize_input) {
            Some(handle) if !handle.is_empty() => Some(validate_instagram_handle(&handle)?),
            _ => None,
        };

        Ok(ProfileFields {
            first_name,
            age,
            interests,
            instagram_handle,
        })
    }
}

pub fn validate_first_name(raw: &str) -> Result<String> {
    let name = sanitize_input(raw);
    if name.is_empty() {
        return Err(CoreError::validation("First name is required"));
    }
    if name.chars().count() > MAX_FIRST_NAME_CHARS {
        return Err(CoreError::validation(format!(
            "First name must be {MAX_FIRST_NAME_CHARS} characters or less"
        )));
    }
    Ok(name)
}

pub fn validate_age(raw: &str) -> Result<i32> {
    let age: i32 = raw
        .trim()
        .parse()
        .map_err(|_| CoreError::validation("Age must be a number"))?;
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(CoreError::validation(format!(
            "Age must be between {MIN_AGE} and {MAX_AGE}"
        )));
    }
    Ok(age)
}

/// Interests must be a JSON array; returns its compact JSON text.
pub fn validate_interests(raw: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|_| CoreError::validation("Invalid interests format"))?;
    if !value.is_array() {
        return Err(CoreError::validation("Invalid interests format"));
    }
    Ok(value.to_string())
}

fn instagram_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9._]{1,30}$").expect("valid instagram regex"))
}

pub fn validate_instagram_handle(handle: &str) -> Result<String> {
    let handle = handle.trim_start_matches('@');
    if !instagram_pattern().is_match(handle) {
        return Err(CoreError::validation("Invalid Instagram handle"));
    }
    Ok(handle.to_string())
}

/// Check a sniffed MIME type and byte size of an uploaded photo
pub fn validate_photo(mime_type: Option<&str>, size: usize) -> Result<()> {
    match mime_type {
        Some(mime) if ALLOWED_PHOTO_TYPES.contains(&mime) => {}
        _ => {
            return Err(CoreError::validation(
                "Invalid file type. Please upload a JPEG, PNG, WebP or GIF image.",
            ))
        }
    }
    if size > MAX_PHOTO_BYTES {
        return Err(CoreError::validation("File too large. Maximum size is 20MB."));
    }
    Ok(())
}

/// Object key of a user's profile picture in [`PROFILE_PICTURE_BUCKET`]
pub fn profile_picture_key(user_id: &str) -> String {
    format!("{user_id}.jpg")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, age: &str, interests: &str, instagram: Option<&str>) -> ProfileForm {
        ProfileForm {
            first_name: Some(name.to_string()),
            age: Some(age.to_string()),
            interests: Some(interests.to_string()),
            instagram_handle: instagram.map(String::from),
        }
    }

    #[test]
    fn test_valid_form() {
        let fields = form("Mia", "29", r#"["hiking", "board games"]"#, Some("@mia.h_"))
            .validate()
            .unwrap();
        assert_eq!(fields.first_name, "Mia");
        assert_eq!(fields.age, 29);
        assert_eq!(fields.interests, r#"["hiking","board games"]"#);
        assert_eq!(fields.instagram_handle.as_deref(), Some("mia.h_"));
    }

    #[test]
    fn test_first_name_length() {
        assert!(validate_first_name(&"a".repeat(25)).is_ok());
        let err = validate_first_name(&"a".repeat(26)).unwrap_err();
        assert_eq!(err.to_string(), "First name must be 25 characters or less");
        assert!(validate_first_name("   ").is_err());
    }

    #[test]
    fn test_first_name_is_sanitized() {
        assert_eq!(validate_first_name("<b>Sam</b> ").unwrap(), "Sam");
    }

    #[test]
    fn test_age_bounds() {
        assert!(validate_age("17").is_err());
        assert_eq!(validate_age("18").unwrap(), 18);
        assert_eq!(validate_age("120").unwrap(), 120);
        assert!(validate_age("121").is_err());
        assert!(validate_age("twenty").is_err());
    }

    #[test]
    fn test_interests_must_be_array() {
        assert!(validate_interests(r#"{"a": 1}"#).is_err());
        assert!(validate_interests("not json").is_err());
        assert_eq!(validate_interests("[]").unwrap(), "[]");
    }

    #[test]
    fn test_instagram_handle() {
        assert!(validate_instagram_handle("good.handle_1").is_ok());
        assert!(validate_instagram_handle("bad handle").is_err());
        assert!(validate_instagram_handle(&"x".repeat(31)).is_err());
    }

    #[test]
    fn test_empty_instagram_is_none() {
        let fields = form("Mia", "29", "[]", Some("  ")).validate().unwrap();
        assert_eq!(fields.instagram_handle, None);
    }

    #[test]
    fn test_photo_rules() {
        assert!(validate_photo(Some("image/png"), 1024).is_ok());
        assert!(validate_photo(Some("image/bmp"), 1024).is_err());
        assert!(validate_photo(None, 1024).is_err());
        assert!(validate_photo(Some("image/jpeg"), MAX_PHOTO_BYTES + 1).is_err());
    }
}
