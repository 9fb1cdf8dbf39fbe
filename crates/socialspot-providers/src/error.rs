// Provider error types

use std::env;

use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Object storage error: {0}")]
    ObjectStore(String),
}

/// Read a required environment variable
pub(crate) fn require_env(name: &'static str) -> Result<String, ProviderError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ProviderError::MissingEnv(name)),
    }
}

/// Turn a non-2xx response into `ProviderError::Api`, keeping the body for the log
pub(crate) async fn check_status(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    error!(provider, status = %status, body = %body, "Provider request failed");
    Err(ProviderError::Api {
        status: status.as_u16(),
        body,
    })
}
