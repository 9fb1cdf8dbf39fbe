// Pusher Channels HTTP API (trigger events)
//
// Requests are signed per the Pusher REST auth scheme:
// HMAC-SHA256 over "POST\n{path}\n{sorted query}" with the app secret,
// where the query carries auth_key, auth_timestamp, auth_version and body_md5.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use reqwest::Client;
use serde::Serialize;
use sha2::Sha256;
use socialspot_core::{Broadcaster, CoreError, Result};
use std::time::Duration;
use tracing::debug;

use crate::error::{check_status, require_env, ProviderError};

type HmacSha256 = Hmac<Sha256>;

const AUTH_VERSION: &str = "1.0";

#[derive(Debug, Clone)]
pub struct PusherConfig {
    pub app_id: String,
    pub key: String,
    pub secret: String,
    pub base_url: String,
}

impl PusherConfig {
    /// Environment variables:
    /// - `PUSHER_APP_ID`, `PUSHER_KEY`, `PUSHER_SECRET`, `PUSHER_CLUSTER` (required)
    /// - `PUSHER_BASE_URL` overrides the cluster host
    pub fn from_env() -> std::result::Result<Self, ProviderError> {
        let cluster = require_env("PUSHER_CLUSTER")?;
        Ok(Self {
            app_id: require_env("PUSHER_APP_ID")?,
            key: require_env("PUSHER_KEY")?,
            secret: require_env("PUSHER_SECRET")?,
            base_url: std::env::var("PUSHER_BASE_URL")
                .unwrap_or_else(|_| format!("https://api-{cluster}.pusher.com")),
        })
    }
}

#[derive(Debug, Serialize)]
struct TriggerBody<'a> {
    name: &'a str,
    channels: [&'a str; 1],
    /// Pusher expects the event payload as a JSON string
    data: String,
}

pub struct PusherBroadcaster {
    config: PusherConfig,
    client: Client,
}

impl PusherBroadcaster {
    pub fn new(config: PusherConfig) -> std::result::Result<Self, ProviderError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { config, client })
    }

    fn events_path(&self) -> String {
        format!("/apps/{}/events", self.config.app_id)
    }

    /// Signed query string for a request body at `timestamp` (unix seconds)
    pub fn signed_query(
        &self,
        body: &str,
        timestamp: i64,
    ) -> std::result::Result<String, ProviderError> {
        let body_md5 = hex::encode(Md5::digest(body.as_bytes()));
        let query = format!(
            "auth_key={}&auth_timestamp={}&auth_version={}&body_md5={}",
            self.config.key, timestamp, AUTH_VERSION, body_md5
        );
        let to_sign = format!("POST\n{}\n{}", self.events_path(), query);
        let signature = sign(&self.config.secret, &to_sign)?;
        Ok(format!("{query}&auth_signature={signature}"))
    }

    async fn post(
        &self,
        channel: &str,
        event: &str,
        payload: &serde_json::Value,
    ) -> std::result::Result<(), ProviderError> {
        let body = serde_json::to_string(&TriggerBody {
            name: event,
            channels: [channel],
            data: payload.to_string(),
        })
        .map_err(|e| ProviderError::Config(e.to_string()))?;

        let query = self.signed_query(&body, chrono::Utc::now().timestamp())?;
        let url = format!(
            "{}{}?{}",
            self.config.base_url.trim_end_matches('/'),
            self.events_path(),
            query
        );

        debug!(channel = %channel, event = %event, "Triggering Pusher event");
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;
        check_status("pusher", response).await?;
        Ok(())
    }
}

fn sign(secret: &str, message: &str) -> std::result::Result<String, ProviderError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ProviderError::Config(format!("invalid Pusher secret: {e}")))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl Broadcaster for PusherBroadcaster {
    async fn trigger(
        &self,
        channel: &str,
        event: &str,
        payload: &serde_json::Value,
    ) -> Result<()> {
        self.post(channel, event, payload)
            .await
            .map_err(|e| CoreError::broadcast(e.to_string()))
    }
}
