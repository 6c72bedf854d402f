use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::configuration::PaymentSettings;

const REQUEST_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment processor request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("payment processor returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// One line on the hosted checkout page, amounts in minor units
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: u32,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub line_items: Vec<LineItem>,
    pub customer_email: String,
    pub metadata: BTreeMap<String, String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &SessionRequest,
    ) -> Result<CreatedSession, PaymentError>;
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// Client for the hosted checkout API
#[derive(Debug, Clone)]
pub struct StripeClient {
    http: Client,
    base_url: String,
    secret_key: String,
    currency: String,
}

impl StripeClient {
    pub fn new(settings: &PaymentSettings) -> Result<Self, PaymentError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;
        Ok(Self {
            http,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            secret_key: settings.secret_key.clone(),
            currency: settings.currency.clone(),
        })
    }

    /// The API takes bracketed form keys rather than JSON
    pub fn form_fields(&self, request: &SessionRequest) -> Vec<(String, String)> {
        let mut fields = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("customer_email".to_string(), request.customer_email.clone()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
        ];
        for (i, item) in request.line_items.iter().enumerate() {
            let prefix = format!("line_items[{}]", i);
            fields.push((
                format!("{}[price_data][currency]", prefix),
                self.currency.clone(),
            ));
            fields.push((
                format!("{}[price_data][product_data][name]", prefix),
                item.name.clone(),
            ));
            if let Some(image) = &item.image {
                fields.push((
                    format!("{}[price_data][product_data][images][0]", prefix),
                    image.clone(),
                ));
            }
            fields.push((
                format!("{}[price_data][unit_amount]", prefix),
                item.unit_amount.to_string(),
            ));
            fields.push((format!("{}[quantity]", prefix), item.quantity.to_string()));
        }
        for (key, value) in &request.metadata {
            fields.push((format!("metadata[{}]", key), value.clone()));
        }
        fields
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    #[tracing::instrument(skip(self, request), fields(line_items = request.line_items.len()))]
    async fn create_checkout_session(
        &self,
        request: &SessionRequest,
    ) -> Result<CreatedSession, PaymentError> {
        let url = format!("{}/v1/checkout/sessions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&self.form_fields(request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or(text);
            return Err(PaymentError::Api { status, message });
        }

        let session: CreatedSession = response.json().await?;
        tracing::info!(session_id = %session.id, "checkout session created");
        Ok(session)
    }
}
