// marketplace/src/db/postgres.rs

use crate::db::{CartStore, Catalog, OrderStore, PaymentLedger};
use crate::errors::{AppError, Result};
use crate::models::order_item::NewOrderItem;
use crate::models::{
  CartLine, NewCartLine, NewPayment, Order, OrderDraft, OrderItem, OrderStatus, Payment, PaymentStatus, Product,
};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tracing::{info, instrument};

const ORDER_COLUMNS: &str =
  "id, user_id, status, amount_cents, transaction_id, payment_id, order_ref_number, created_at, updated_at";
const PAYMENT_COLUMNS: &str =
  "id, user_id, amount_cents, order_ref, payment_id, payment_url, status, created_at, updated_at";
const CART_COLUMNS: &str =
  "user_id, product_id, name, image_url, seller_id, price_cents, quantity, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(max_connections)
      .connect(database_url)
      .await?;
    info!(max_connections, "Connected to Postgres.");
    Ok(Self::new(pool))
  }

  #[instrument(skip(self))]
  pub async fn run_migrations(&self) -> Result<()> {
    info!("Running database migrations");
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    info!("Database migrations completed");
    Ok(())
  }

  async fn attach_items(&self, mut orders: Vec<Order>) -> Result<Vec<Order>> {
    if orders.is_empty() {
      return Ok(orders);
    }
    let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let items = sqlx::query_as::<_, OrderItem>(
      r#"
      SELECT id, order_id, product_id, name, image_url, seller_id, price_cents, quantity, created_at
      FROM order_items
      WHERE order_id = ANY($1)
      ORDER BY id
      "#,
    )
    .bind(&ids)
    .fetch_all(&self.pool)
    .await?;

    let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
    for item in items {
      by_order.entry(item.order_id).or_default().push(item);
    }
    for order in &mut orders {
      order.items = by_order.remove(&order.id).unwrap_or_default();
    }
    Ok(orders)
  }
}

async fn insert_item(tx: &mut Transaction<'_, Postgres>, order_id: i64, item: &NewOrderItem) -> Result<OrderItem> {
  let row = sqlx::query_as::<_, OrderItem>(
    r#"
    INSERT INTO order_items (order_id, product_id, name, image_url, seller_id, price_cents, quantity)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
    RETURNING id, order_id, product_id, name, image_url, seller_id, price_cents, quantity, created_at
    "#,
  )
  .bind(order_id)
  .bind(item.product_id)
  .bind(&item.name)
  .bind(&item.image_url)
  .bind(item.seller_id)
  .bind(item.price_cents)
  .bind(item.quantity)
  .fetch_one(&mut **tx)
  .await?;
  Ok(row)
}

async fn clear_cart(tx: &mut Transaction<'_, Postgres>, user_id: i64) -> Result<u64> {
  let done = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
    .bind(user_id)
    .execute(&mut **tx)
    .await?;
  Ok(done.rows_affected())
}

#[async_trait]
impl Catalog for PgStore {
  async fn find_product(&self, product_id: i64) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
      r#"
      SELECT id, name, description, image_url, price_cents, seller_id, stock, created_at, updated_at
      FROM products
      WHERE id = $1
      "#,
    )
    .bind(product_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(product)
  }
}

#[async_trait]
impl CartStore for PgStore {
  async fn find_line(&self, user_id: i64, product_id: i64) -> Result<Option<CartLine>> {
    let line = sqlx::query_as::<_, CartLine>(&format!(
      "SELECT {} FROM cart_lines WHERE user_id = $1 AND product_id = $2",
      CART_COLUMNS
    ))
    .bind(user_id)
    .bind(product_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(line)
  }

  async fn insert_line(&self, line: &NewCartLine) -> Result<CartLine> {
    let row = sqlx::query_as::<_, CartLine>(&format!(
      r#"
      INSERT INTO cart_lines (user_id, product_id, name, image_url, seller_id, price_cents, quantity)
      VALUES ($1, $2, $3, $4, $5, $6, $7)
      ON CONFLICT (user_id, product_id)
      DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW()
      RETURNING {}
      "#,
      CART_COLUMNS
    ))
    .bind(line.user_id)
    .bind(line.product_id)
    .bind(&line.name)
    .bind(&line.image_url)
    .bind(line.seller_id)
    .bind(line.price_cents)
    .bind(line.quantity)
    .fetch_one(&self.pool)
    .await?;
    Ok(row)
  }

  async fn update_quantity(&self, user_id: i64, product_id: i64, quantity: i32) -> Result<CartLine> {
    sqlx::query_as::<_, CartLine>(&format!(
      r#"
      UPDATE cart_lines SET quantity = $3, updated_at = NOW()
      WHERE user_id = $1 AND product_id = $2
      RETURNING {}
      "#,
      CART_COLUMNS
    ))
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Cart line for product {} not found.", product_id)))
  }

  async fn delete_line(&self, user_id: i64, product_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM cart_lines WHERE user_id = $1 AND product_id = $2")
      .bind(user_id)
      .bind(product_id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn lines_for_user(&self, user_id: i64) -> Result<Vec<CartLine>> {
    let lines = sqlx::query_as::<_, CartLine>(&format!(
      "SELECT {} FROM cart_lines WHERE user_id = $1 ORDER BY created_at, product_id",
      CART_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(lines)
  }
}

#[async_trait]
impl OrderStore for PgStore {
  #[instrument(skip(self, draft), fields(user_id = draft.user_id, order_ref = %draft.order_ref_number))]
  async fn place_order(&self, draft: &OrderDraft) -> Result<Order> {
    // Rolled back on drop if any step below returns early.
    let mut tx = self.pool.begin().await?;

    let mut order = sqlx::query_as::<_, Order>(&format!(
      r#"
      INSERT INTO orders (user_id, status, amount_cents, payment_id, order_ref_number)
      VALUES ($1, 'pending', $2, $3, $4)
      RETURNING {}
      "#,
      ORDER_COLUMNS
    ))
    .bind(draft.user_id)
    .bind(draft.amount_cents)
    .bind(&draft.payment_id)
    .bind(&draft.order_ref_number)
    .fetch_one(&mut *tx)
    .await?;

    for item in &draft.items {
      order.items.push(insert_item(&mut tx, order.id, item).await?);
    }

    let cleared = clear_cart(&mut tx, draft.user_id).await?;
    tx.commit().await?;

    info!(order_id = order.id, items = order.items.len(), cleared_lines = cleared, "Order persisted and cart cleared.");
    Ok(order)
  }

  async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>(&format!(
      "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
      ORDER_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;
    self.attach_items(orders).await
  }

  async fn find_order(&self, user_id: i64, order_ref: &str) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!(
      "SELECT {} FROM orders WHERE user_id = $1 AND order_ref_number = $2",
      ORDER_COLUMNS
    ))
    .bind(user_id)
    .bind(order_ref)
    .fetch_optional(&self.pool)
    .await?;

    match order {
      Some(order) => Ok(self.attach_items(vec![order]).await?.pop()),
      None => Ok(None),
    }
  }

  async fn settle_orders(&self, payment_id: &str, status: OrderStatus) -> Result<u64> {
    let done = sqlx::query(
      r#"
      UPDATE orders SET status = $2, transaction_id = $1, updated_at = NOW()
      WHERE payment_id = $1 AND status = 'pending'
      "#,
    )
    .bind(payment_id)
    .bind(status)
    .execute(&self.pool)
    .await?;
    Ok(done.rows_affected())
  }
}

#[async_trait]
impl PaymentLedger for PgStore {
  async fn find_active_session(&self, user_id: i64) -> Result<Option<Payment>> {
    let payment = sqlx::query_as::<_, Payment>(&format!(
      r#"
      SELECT {} FROM payments
      WHERE user_id = $1 AND status IN ('initial', 'pending')
      ORDER BY created_at DESC, id DESC
      LIMIT 1
      "#,
      PAYMENT_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(payment)
  }

  async fn find_by_session_id(&self, session_id: &str) -> Result<Option<Payment>> {
    let payment = sqlx::query_as::<_, Payment>(&format!(
      "SELECT {} FROM payments WHERE payment_id = $1",
      PAYMENT_COLUMNS
    ))
    .bind(session_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(payment)
  }

  async fn record_session(&self, payment: &NewPayment) -> Result<Payment> {
    // payments_one_active_per_user turns a concurrent second session into a
    // unique violation, which surfaces as Conflict.
    let row = sqlx::query_as::<_, Payment>(&format!(
      r#"
      INSERT INTO payments (user_id, amount_cents, order_ref, payment_id, payment_url, status)
      VALUES ($1, $2, $3, $4, $5, $6)
      RETURNING {}
      "#,
      PAYMENT_COLUMNS
    ))
    .bind(payment.user_id)
    .bind(payment.amount_cents)
    .bind(&payment.order_ref)
    .bind(&payment.payment_id)
    .bind(&payment.payment_url)
    .bind(PaymentStatus::Initial)
    .fetch_one(&self.pool)
    .await?;
    Ok(row)
  }

  async fn update_status(&self, payment_id: i64, from: PaymentStatus, to: PaymentStatus) -> Result<Payment> {
    sqlx::query_as::<_, Payment>(&format!(
      r#"
      UPDATE payments SET status = $3, updated_at = NOW()
      WHERE id = $1 AND status = $2
      RETURNING {}
      "#,
      PAYMENT_COLUMNS
    ))
    .bind(payment_id)
    .bind(from)
    .bind(to)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| {
      AppError::Conflict(format!(
        "Payment {} is no longer '{}'.",
        payment_id,
        from.as_str()
      ))
    })
  }
}
