// Cloudflare R2 object storage through the S3 API

use async_trait::async_trait;
use aws_config::Region;
use aws_credential_types::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use chrono::Duration;
use socialspot_core::{CoreError, ObjectStore, Result};
use tracing::{debug, info};

use crate::error::{require_env, ProviderError};

/// R2 ignores the region but the SDK requires one
const R2_REGION: &str = "auto";

#[derive(Debug, Clone)]
pub struct R2Config {
    pub account_id: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Overrides the account endpoint (e.g. a local S3-compatible server)
    pub endpoint: Option<String>,
}

impl R2Config {
    /// Environment variables:
    /// - `ACCOUNT_ID`, `MYAWS_ACCESS_KEY_ID`, `MYAWS_SECRET_ACCESS_KEY` (required)
    /// - `R2_ENDPOINT` (optional override)
    pub fn from_env() -> std::result::Result<Self, ProviderError> {
        Ok(Self {
            account_id: require_env("ACCOUNT_ID")?,
            access_key_id: require_env("MYAWS_ACCESS_KEY_ID")?,
            secret_access_key: require_env("MYAWS_SECRET_ACCESS_KEY")?,
            endpoint: std::env::var("R2_ENDPOINT").ok(),
        })
    }

    pub fn endpoint_url(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.r2.cloudflarestorage.com", self.account_id))
    }
}

#[derive(Debug, Clone)]
pub struct R2ObjectStore {
    client: aws_sdk_s3::Client,
}

impl R2ObjectStore {
    pub fn new(config: &R2Config) -> Self {
        let credentials = Credentials::from_keys(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
        );
        let s3_config = aws_sdk_s3::config::Builder::new()
            .endpoint_url(config.endpoint_url())
            .region(Region::new(R2_REGION))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
        }
    }
}

fn object_store_error(e: impl std::fmt::Display) -> CoreError {
    CoreError::object_store(e.to_string())
}

#[async_trait]
impl ObjectStore for R2ObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| object_store_error(aws_sdk_s3::error::DisplayErrorContext(e)))?;

        info!(bucket, key, size, "Uploaded object");
        Ok(())
    }

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String> {
        let expires_in = expires_in.to_std().map_err(object_store_error)?;
        let presigning = PresigningConfig::expires_in(expires_in).map_err(object_store_error)?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| object_store_error(aws_sdk_s3::error::DisplayErrorContext(e)))?;

        Ok(request.uri().to_string())
    }

    async fn check_bucket(&self, bucket: &str) -> Result<()> {
        debug!(bucket, "Checking bucket access");
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.as_service_error().map(|se| se.is_not_found());
                match service_error {
                    Some(true) => CoreError::object_store(format!(
                        "The {bucket} bucket does not exist. Please create it in your R2 dashboard."
                    )),
                    _ => object_store_error(aws_sdk_s3::error::DisplayErrorContext(e)),
                }
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_from_account() {
        let config = R2Config {
            account_id: "abc123".to_string(),
            access_key_id: "id".to_string(),
            secret_access_key: "secret".to_string(),
            endpoint: None,
        };
        assert_eq!(
            config.endpoint_url(),
            "https://abc123.r2.cloudflarestorage.com"
        );

        let local = R2Config {
            endpoint: Some("http://localhost:9000".to_string()),
            ..config
        };
        assert_eq!(local.endpoint_url(), "http://localhost:9000");
    }

    #[tokio::test]
    async fn test_presigned_url_is_signed_for_key() {
        let store = R2ObjectStore::new(&R2Config {
            account_id: "abc123".to_string(),
            access_key_id: "id".to_string(),
            secret_access_key: "secret".to_string(),
            endpoint: None,
        });

        let url = store
            .presigned_get_url("profile-pictures", "user-1.jpg", Duration::hours(1))
            .await
            .unwrap();

        assert!(url.starts_with(
            "https://abc123.r2.cloudflarestorage.com/profile-pictures/user-1.jpg?"
        ));
        assert!(url.contains("X-Amz-Expires=3600"));
        assert!(url.contains("X-Amz-Signature="));
    }
}
