// marketplace/src/services/payment_mock.rs

use crate::errors::{AppError, Result as AppResult};
use crate::models::PaymentStatus;
use crate::services::gateway::{GatewaySession, PaymentGateway};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// In-process provider. Sessions stay `initial` until an outcome is scripted
/// with [`MockGateway::set_outcome`].
#[derive(Debug, Default)]
pub struct MockGateway {
  checkout_base_url: String,
  outcomes: Mutex<HashMap<String, PaymentStatus>>,
  unavailable: AtomicBool,
  opened: AtomicUsize,
}

impl MockGateway {
  pub fn new(checkout_base_url: impl Into<String>) -> Self {
    Self {
      checkout_base_url: checkout_base_url.into(),
      ..Self::default()
    }
  }

  /// While set, every call fails as if the provider were unreachable.
  pub fn set_unavailable(&self, unavailable: bool) {
    self.unavailable.store(unavailable, Ordering::SeqCst);
  }

  pub fn set_outcome(&self, session_id: &str, status: PaymentStatus) {
    self.outcomes.lock().insert(session_id.to_string(), status);
  }

  /// Number of sessions opened so far.
  pub fn opened_sessions(&self) -> usize {
    self.opened.load(Ordering::SeqCst)
  }

  fn ensure_available(&self) -> AppResult<()> {
    if self.unavailable.load(Ordering::SeqCst) {
      warn!("Mock payment provider is switched to unavailable.");
      return Err(AppError::Upstream("mock provider unavailable".to_string()));
    }
    Ok(())
  }
}

#[async_trait]
impl PaymentGateway for MockGateway {
  fn name(&self) -> &'static str {
    "mock"
  }

  #[instrument(skip(self), fields(provider = "mock"))]
  async fn open_session(&self, amount_cents: i64, user_id: i64, order_ref: &str) -> AppResult<GatewaySession> {
    self.ensure_available()?;
    if amount_cents <= 0 {
      return Err(AppError::Validation("Amount must be greater than zero".to_string()));
    }

    let session_id = format!("mock_cs_{}", Uuid::new_v4().simple());
    let redirect_url = format!("{}/{}", self.checkout_base_url, session_id);
    self.outcomes.lock().insert(session_id.clone(), PaymentStatus::Initial);
    self.opened.fetch_add(1, Ordering::SeqCst);

    info!(%session_id, "Mock checkout session opened.");
    Ok(GatewaySession {
      session_id,
      redirect_url,
    })
  }

  #[instrument(skip(self), fields(provider = "mock"))]
  async fn session_status(&self, session_id: &str) -> AppResult<PaymentStatus> {
    self.ensure_available()?;
    self
      .outcomes
      .lock()
      .get(session_id)
      .copied()
      .ok_or_else(|| AppError::Upstream(format!("unknown checkout session '{}'", session_id)))
  }
}
