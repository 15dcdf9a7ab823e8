// marketplace/src/services/gateway.rs

use crate::config::{PaymentConfig, PaymentProvider};
use crate::errors::Result;
use crate::models::PaymentStatus;
use crate::services::{MockGateway, StripeGateway};
use async_trait::async_trait;
use std::sync::Arc;

/// A hosted payment page opened at the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySession {
  pub session_id: String,
  pub redirect_url: String,
}

/// Hosted-checkout provider. Amounts are minor units; adapters convert to
/// whatever the provider expects. Transport or provider failures are
/// `AppError::Upstream`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
  fn name(&self) -> &'static str;

  async fn open_session(&self, amount_cents: i64, user_id: i64, order_ref: &str) -> Result<GatewaySession>;

  async fn session_status(&self, session_id: &str) -> Result<PaymentStatus>;
}

pub fn build_gateway(config: &PaymentConfig, app_base_url: &str) -> Result<Arc<dyn PaymentGateway>> {
  let gateway: Arc<dyn PaymentGateway> = match config.provider {
    PaymentProvider::Stripe => Arc::new(StripeGateway::new(config)?),
    PaymentProvider::Mock => Arc::new(MockGateway::new(format!("{}/mock-checkout", app_base_url))),
  };
  tracing::info!(provider = gateway.name(), "Payment gateway configured.");
  Ok(gateway)
}
