// marketplace/src/models/order.rs

use crate::errors::Result;
use crate::models::cart_line::cart_total_cents;
use crate::models::order_item::NewOrderItem;
use crate::models::{CartLine, OrderItem};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, Type as SqlxType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Paid,
  Failed,
  Cancelled,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: i64,
  pub user_id: i64,
  pub status: OrderStatus,
  pub amount_cents: i64,
  pub transaction_id: Option<String>,
  /// Gateway session id of the payment this order was placed against.
  pub payment_id: Option<String>,
  pub order_ref_number: String,
  #[sqlx(skip)]
  pub items: Vec<OrderItem>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Everything needed to write an order and its items in one go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
  pub user_id: i64,
  pub amount_cents: i64,
  pub order_ref_number: String,
  pub payment_id: Option<String>,
  pub items: Vec<NewOrderItem>,
}

impl OrderDraft {
  /// Amount is taken from the line snapshots, not re-priced.
  pub fn from_cart(
    user_id: i64,
    lines: &[CartLine],
    order_ref_number: String,
    payment_id: Option<String>,
  ) -> Result<Self> {
    Ok(Self {
      user_id,
      amount_cents: cart_total_cents(lines)?,
      order_ref_number,
      payment_id,
      items: lines.iter().map(NewOrderItem::from).collect(),
    })
  }
}
