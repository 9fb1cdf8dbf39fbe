// Site-wide settings used when rendering outbound emails and links

use serde::{Deserialize, Serialize};

pub const DEFAULT_SITE_URL: &str = "https://socialspot.com.au";
pub const DEFAULT_FROM_EMAIL: &str = "noreply@socialspot.com.au";
pub const DEFAULT_FROM_NAME: &str = "SocialSpot";
pub const DEFAULT_MODERATION_EMAIL: &str = "mitchell@socialspot.com.au";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Public site origin, without trailing slash
    pub base_url: String,
    pub from_email: String,
    pub from_name: String,
    /// Where user reports are sent
    pub moderation_email: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SITE_URL.to_string(),
            from_email: DEFAULT_FROM_EMAIL.to_string(),
            from_name: DEFAULT_FROM_NAME.to_string(),
            moderation_email: DEFAULT_MODERATION_EMAIL.to_string(),
        }
    }
}

impl SiteConfig {
    /// Load from environment variables, falling back to defaults
    ///
    /// - `SITE_BASE_URL`
    /// - `EMAIL_FROM_ADDRESS`
    /// - `EMAIL_FROM_NAME`
    /// - `MODERATION_EMAIL`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("SITE_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            from_email: std::env::var("EMAIL_FROM_ADDRESS").unwrap_or(defaults.from_email),
            from_name: std::env::var("EMAIL_FROM_NAME").unwrap_or(defaults.from_name),
            moderation_email: std::env::var("MODERATION_EMAIL")
                .unwrap_or(defaults.moderation_email),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Absolute link to a site path such as `/events/12`
    pub fn link(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
