// Mailjet transactional email (Send API v3.1)

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Serialize;
use socialspot_core::{CoreError, Email, Mailer, Result};
use std::time::Duration;
use tracing::debug;

use crate::error::{check_status, require_env, ProviderError};

const DEFAULT_MAILJET_URL: &str = "https://api.mailjet.com";

#[derive(Debug, Clone)]
pub struct MailjetConfig {
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
}

impl MailjetConfig {
    /// Environment variables:
    /// - `MAILJET_API_KEY`, `MAILJET_API_SECRET` (required)
    /// - `MAILJET_BASE_URL` (default: https://api.mailjet.com)
    pub fn from_env() -> std::result::Result<Self, ProviderError> {
        Ok(Self {
            api_key: require_env("MAILJET_API_KEY")?,
            api_secret: require_env("MAILJET_API_SECRET")?,
            base_url: std::env::var("MAILJET_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_MAILJET_URL.to_string()),
        })
    }

    /// Basic auth header value
    pub fn auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.api_key, self.api_secret);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendRequest<'a> {
    messages: Vec<SendMessage<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendMessage<'a> {
    from: Address<'a>,
    to: Vec<Address<'a>>,
    subject: &'a str,
    #[serde(rename = "HTMLPart")]
    html_part: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

pub struct MailjetMailer {
    config: MailjetConfig,
    client: Client,
}

impl MailjetMailer {
    pub fn new(config: MailjetConfig) -> std::result::Result<Self, ProviderError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { config, client })
    }

    async fn post(&self, email: &Email) -> std::result::Result<(), ProviderError> {
        let request = SendRequest {
            messages: vec![SendMessage {
                from: Address {
                    email: &email.from_email,
                    name: Some(&email.from_name),
                },
                to: vec![Address {
                    email: &email.to_email,
                    name: None,
                }],
                subject: &email.subject,
                html_part: &email.html,
            }],
        };

        let url = format!("{}/v3.1/send", self.config.base_url.trim_end_matches('/'));
        debug!(to = %email.to_email, subject = %email.subject, "Sending email via Mailjet");

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .json(&request)
            .send()
            .await?;
        check_status("mailjet", response).await?;
        Ok(())
    }
}

#[async_trait]
impl Mailer for MailjetMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        self.post(email)
            .await
            .map_err(|e| CoreError::delivery(e.to_string()))
    }
}
