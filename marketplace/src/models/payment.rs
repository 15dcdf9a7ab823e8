// marketplace/src/models/payment.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, Type as SqlxType};

/// `Initial` is the only state a new session is recorded in. `Success` and
/// `Failed` are terminal; anything else is still an active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SqlxType)]
#[sqlx(type_name = "payment_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Initial,
  Pending,
  Success,
  Failed,
}

impl PaymentStatus {
  pub fn is_terminal(self) -> bool {
    matches!(self, PaymentStatus::Success | PaymentStatus::Failed)
  }

  pub fn is_active(self) -> bool {
    !self.is_terminal()
  }

  pub fn can_transition_to(self, next: PaymentStatus) -> bool {
    match (self, next) {
      (PaymentStatus::Initial, PaymentStatus::Pending | PaymentStatus::Success | PaymentStatus::Failed) => true,
      (PaymentStatus::Pending, PaymentStatus::Success | PaymentStatus::Failed) => true,
      _ => false,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      PaymentStatus::Initial => "initial",
      PaymentStatus::Pending => "pending",
      PaymentStatus::Success => "success",
      PaymentStatus::Failed => "failed",
    }
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Payment {
  pub id: i64,
  pub user_id: i64,
  pub amount_cents: i64,
  /// Order reference generated when the session was opened.
  pub order_ref: String,
  /// Gateway session id.
  pub payment_id: String,
  pub payment_url: String,
  pub status: PaymentStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
  pub user_id: i64,
  pub amount_cents: i64,
  pub order_ref: String,
  pub payment_id: String,
  pub payment_url: String,
}

#[cfg(test)]
mod tests {
  use super::PaymentStatus::*;

  #[test]
  fn initial_moves_to_any_other_state() {
    assert!(Initial.can_transition_to(Pending));
    assert!(Initial.can_transition_to(Success));
    assert!(Initial.can_transition_to(Failed));
    assert!(!Initial.can_transition_to(Initial));
  }

  #[test]
  fn terminal_states_never_move() {
    for terminal in [Success, Failed] {
      assert!(terminal.is_terminal());
      for next in [Initial, Pending, Success, Failed] {
        assert!(!terminal.can_transition_to(next));
      }
    }
    assert!(Pending.is_active());
    assert!(Initial.is_active());
    assert!(Pending.can_transition_to(Success));
    assert!(!Pending.can_transition_to(Initial));
  }
}
