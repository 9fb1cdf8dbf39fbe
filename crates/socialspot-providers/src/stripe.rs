// Stripe payment intents

use async_trait::async_trait;
use reqwest::Client;
use socialspot_core::{CoreError, NewPaymentIntent, PaymentGateway, PaymentIntent, Result};
use std::time::Duration;
use tracing::debug;

use crate::error::{check_status, require_env, ProviderError};

const DEFAULT_STRIPE_URL: &str = "https://api.stripe.com";

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub base_url: String,
}

impl StripeConfig {
    /// Environment variables:
    /// - `STRIPE_SECRET_KEY` (required)
    /// - `STRIPE_BASE_URL` (default: https://api.stripe.com)
    pub fn from_env() -> std::result::Result<Self, ProviderError> {
        Ok(Self {
            secret_key: require_env("STRIPE_SECRET_KEY")?,
            base_url: std::env::var("STRIPE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_STRIPE_URL.to_string()),
        })
    }
}

pub struct StripeGateway {
    config: StripeConfig,
    client: Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> std::result::Result<Self, ProviderError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn create(
        &self,
        request: &NewPaymentIntent,
    ) -> std::result::Result<PaymentIntent, ProviderError> {
        let response = self
            .client
            .post(self.url("/v1/payment_intents"))
            .bearer_auth(&self.config.secret_key)
            .form(&form_fields(request))
            .send()
            .await?;
        let intent = check_status("stripe", response).await?.json().await?;
        Ok(intent)
    }

    async fn retrieve(&self, id: &str) -> std::result::Result<PaymentIntent, ProviderError> {
        let response = self
            .client
            .get(self.url(&format!("/v1/payment_intents/{id}")))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await?;
        let intent = check_status("stripe", response).await?.json().await?;
        Ok(intent)
    }
}

/// Form encoding of a payment intent, metadata flattened as `metadata[key]`
pub fn form_fields(request: &NewPaymentIntent) -> Vec<(String, String)> {
    let mut fields = vec![
        ("amount".to_string(), request.amount.to_string()),
        ("currency".to_string(), request.currency.clone()),
        (
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string(),
        ),
    ];
    let mut metadata: Vec<_> = request.metadata.iter().collect();
    metadata.sort();
    fields.extend(
        metadata
            .into_iter()
            .map(|(key, value)| (format!("metadata[{key}]"), value.clone())),
    );
    fields
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_payment_intent(&self, request: &NewPaymentIntent) -> Result<PaymentIntent> {
        debug!(amount = request.amount, currency = %request.currency, "Creating payment intent");
        self.create(request)
            .await
            .map_err(|e| CoreError::payment(e.to_string()))
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent> {
        self.retrieve(id)
            .await
            .map_err(|e| CoreError::payment(e.to_string()))
    }
}
