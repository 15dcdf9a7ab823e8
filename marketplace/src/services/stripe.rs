// marketplace/src/services/stripe.rs

use crate::config::PaymentConfig;
use crate::errors::{AppError, Result};
use crate::models::PaymentStatus;
use crate::services::gateway::{GatewaySession, PaymentGateway};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument, warn};

/// Stripe Checkout Sessions. Credentials and URLs are fixed at construction.
pub struct StripeGateway {
  client: reqwest::Client,
  secret_key: String,
  api_base: String,
  success_url: String,
  cancel_url: String,
  currency: String,
}

#[derive(Debug, Deserialize)]
struct CheckoutSession {
  id: String,
  url: Option<String>,
  status: Option<String>,
  payment_status: Option<String>,
}

impl StripeGateway {
  pub fn new(config: &PaymentConfig) -> Result<Self> {
    let secret_key = config
      .stripe_secret_key
      .clone()
      .ok_or_else(|| AppError::Config("STRIPE_SECRET_KEY is not set".to_string()))?;
    let client = reqwest::Client::builder()
      .timeout(config.timeout)
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

    Ok(Self {
      client,
      secret_key,
      api_base: config.stripe_api_base.trim_end_matches('/').to_string(),
      success_url: config.success_url.clone(),
      cancel_url: config.cancel_url.clone(),
      currency: config.currency.clone(),
    })
  }

  async fn read_session(&self, response: reqwest::Response) -> Result<CheckoutSession> {
    if !response.status().is_success() {
      let status = response.status();
      let error_text = response.text().await.unwrap_or_default();
      warn!(%status, body = %error_text, "Stripe API error");
      return Err(AppError::Upstream(format!("Stripe responded with {}", status)));
    }
    response
      .json::<CheckoutSession>()
      .await
      .map_err(|e| AppError::Upstream(format!("Failed to parse Stripe response: {}", e)))
  }
}

fn map_status(session: &CheckoutSession) -> PaymentStatus {
  match (session.status.as_deref(), session.payment_status.as_deref()) {
    (Some("complete"), Some("paid")) => PaymentStatus::Success,
    (Some("complete"), _) => PaymentStatus::Pending,
    (Some("expired"), _) => PaymentStatus::Failed,
    _ => PaymentStatus::Initial,
  }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
  fn name(&self) -> &'static str {
    "stripe"
  }

  #[instrument(skip(self), fields(provider = "stripe"))]
  async fn open_session(&self, amount_cents: i64, user_id: i64, order_ref: &str) -> Result<GatewaySession> {
    let params: Vec<(&str, String)> = vec![
      ("mode", "payment".to_string()),
      ("success_url", self.success_url.clone()),
      ("cancel_url", self.cancel_url.clone()),
      ("client_reference_id", order_ref.to_string()),
      ("line_items[0][quantity]", "1".to_string()),
      ("line_items[0][price_data][currency]", self.currency.clone()),
      ("line_items[0][price_data][unit_amount]", amount_cents.to_string()),
      ("line_items[0][price_data][product_data][name]", format!("Order {}", order_ref)),
      ("metadata[order_id]", order_ref.to_string()),
      ("metadata[user_id]", user_id.to_string()),
    ];

    let response = self
      .client
      .post(format!("{}/v1/checkout/sessions", self.api_base))
      .basic_auth(&self.secret_key, Some(""))
      .form(&params)
      .send()
      .await
      .map_err(|e| AppError::Upstream(format!("Stripe request failed: {}", e)))?;

    let session = self.read_session(response).await?;
    let redirect_url = session
      .url
      .ok_or_else(|| AppError::Upstream("Stripe session has no redirect URL".to_string()))?;

    info!(session_id = %session.id, "Stripe checkout session created.");
    Ok(GatewaySession {
      session_id: session.id,
      redirect_url,
    })
  }

  #[instrument(skip(self), fields(provider = "stripe"))]
  async fn session_status(&self, session_id: &str) -> Result<PaymentStatus> {
    let response = self
      .client
      .get(format!("{}/v1/checkout/sessions/{}", self.api_base, session_id))
      .basic_auth(&self.secret_key, Some(""))
      .send()
      .await
      .map_err(|e| AppError::Upstream(format!("Stripe request failed: {}", e)))?;

    let session = self.read_session(response).await?;
    Ok(map_status(&session))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn session(status: Option<&str>, payment_status: Option<&str>) -> CheckoutSession {
    CheckoutSession {
      id: "cs_test".to_string(),
      url: None,
      status: status.map(str::to_string),
      payment_status: payment_status.map(str::to_string),
    }
  }

  #[test]
  fn maps_checkout_states_onto_payment_states() {
    assert_eq!(map_status(&session(Some("complete"), Some("paid"))), PaymentStatus::Success);
    assert_eq!(map_status(&session(Some("complete"), Some("unpaid"))), PaymentStatus::Pending);
    assert_eq!(map_status(&session(Some("expired"), Some("unpaid"))), PaymentStatus::Failed);
    assert_eq!(map_status(&session(Some("open"), Some("unpaid"))), PaymentStatus::Initial);
  }
}
