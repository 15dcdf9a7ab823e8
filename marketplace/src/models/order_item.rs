// marketplace/src/models/order_item.rs

use crate::models::CartLine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Copy of a cart line at the moment the order was placed. Never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct OrderItem {
  pub id: i64,
  pub order_id: i64,
  pub product_id: i64,
  pub name: String,
  pub image_url: String,
  pub seller_id: i64,
  pub price_cents: i64,
  pub quantity: i32,
  pub created_at: DateTime<Utc>,
}

/// Item values before the order row (and its id) exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
  pub product_id: i64,
  pub name: String,
  pub image_url: String,
  pub seller_id: i64,
  pub price_cents: i64,
  pub quantity: i32,
}

impl From<&CartLine> for NewOrderItem {
  fn from(line: &CartLine) -> Self {
    Self {
      product_id: line.product_id,
      name: line.name.clone(),
      image_url: line.image_url.clone(),
      seller_id: line.seller_id,
      price_cents: line.price_cents,
      quantity: line.quantity,
    }
  }
}
