// marketplace/src/models/cart_line.rs

use crate::errors::{AppError, Result};
use crate::models::Product;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// One product in a user's cart.
///
/// `name`, `image_url`, `seller_id` and `price_cents` are copied from the
/// catalog when the line is first added and never refreshed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct CartLine {
  pub user_id: i64,
  pub product_id: i64,
  pub name: String,
  pub image_url: String,
  pub seller_id: i64,
  pub price_cents: i64,
  pub quantity: i32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl CartLine {
  pub fn line_total_cents(&self) -> Result<i64> {
    line_total_cents(self.price_cents, self.quantity)
  }
}

/// `price_cents * quantity`, refusing totals that do not fit in an `i64`.
pub fn line_total_cents(price_cents: i64, quantity: i32) -> Result<i64> {
  price_cents
    .checked_mul(i64::from(quantity))
    .ok_or_else(|| AppError::Validation("Cart line total is too large.".to_string()))
}

/// Sum of the line totals, with the same overflow rule.
pub fn cart_total_cents<'a, I>(lines: I) -> Result<i64>
where
  I: IntoIterator<Item = &'a CartLine>,
{
  lines.into_iter().try_fold(0i64, |acc, line| {
    acc
      .checked_add(line.line_total_cents()?)
      .ok_or_else(|| AppError::Validation("Cart total is too large.".to_string()))
  })
}

#[derive(Debug, Clone)]
pub struct NewCartLine {
  pub user_id: i64,
  pub product_id: i64,
  pub name: String,
  pub image_url: String,
  pub seller_id: i64,
  pub price_cents: i64,
  pub quantity: i32,
}

impl NewCartLine {
  pub fn snapshot(user_id: i64, product: &Product, quantity: i32) -> Self {
    Self {
      user_id,
      product_id: product.id,
      name: product.name.clone(),
      image_url: product.image_url.clone(),
      seller_id: product.seller_id,
      price_cents: product.price_cents,
      quantity,
    }
  }
}

/// A user's cart with its total. An empty cart is a valid value.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CartView {
  pub lines: Vec<CartLine>,
  pub amount_cents: i64,
}

impl CartView {
  pub fn from_lines(lines: Vec<CartLine>) -> Result<Self> {
    let amount_cents = cart_total_cents(&lines)?;
    Ok(Self { lines, amount_cents })
  }

  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }
}
