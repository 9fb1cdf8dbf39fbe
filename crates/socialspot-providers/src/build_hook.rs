// Static site rebuild webhook

use async_trait::async_trait;
use reqwest::Client;
use socialspot_core::{BuildHook, CoreError, Result};
use std::time::Duration;
use tracing::info;

use crate::error::{check_status, require_env, ProviderError};

pub struct WebhookBuildHook {
    url: String,
    client: Client,
}

impl WebhookBuildHook {
    pub fn new(url: impl Into<String>) -> std::result::Result<Self, ProviderError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Reads `BUILD_HOOK_URL`
    pub fn from_env() -> std::result::Result<Self, ProviderError> {
        Self::new(require_env("BUILD_HOOK_URL")?)
    }
}

#[async_trait]
impl BuildHook for WebhookBuildHook {
    async fn trigger(&self) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .send()
            .await
            .map_err(|e| CoreError::build_hook(e.to_string()))?;
        check_status("build_hook", response)
            .await
            .map_err(|e| CoreError::build_hook(e.to_string()))?;

        info!("Triggered site rebuild");
        Ok(())
    }
}
