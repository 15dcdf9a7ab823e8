// marketplace/src/db/memory.rs

use crate::db::{CartStore, Catalog, OrderStore, PaymentLedger};
use crate::errors::{AppError, Result};
use crate::models::{
  CartLine, NewCartLine, NewPayment, Order, OrderDraft, OrderItem, OrderStatus, Payment, PaymentStatus, Product,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, MutexGuard};
use std::collections::{BTreeMap, HashMap};
#[cfg(any(test, feature = "test-utils"))]
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
#[cfg(any(test, feature = "test-utils"))]
use tracing::debug;
use tracing::info;

#[derive(Debug, Clone, Default)]
struct Tables {
  products: HashMap<i64, Product>,
  cart: BTreeMap<(i64, i64), CartLine>,
  orders: Vec<Order>,
  payments: Vec<Payment>,
  next_order_id: i64,
  next_item_id: i64,
  next_payment_id: i64,
}

impl Tables {
  fn clear_cart(&mut self, user_id: i64) -> usize {
    let before = self.cart.len();
    self.cart.retain(|(owner, _), _| *owner != user_id);
    before - self.cart.len()
  }
}

/// Staged copy of the tables. `commit` publishes every write at once;
/// dropping it without committing leaves the store untouched.
struct MemoryTx<'a> {
  live: MutexGuard<'a, Tables>,
  staged: Tables,
}

impl<'a> MemoryTx<'a> {
  fn begin(live: MutexGuard<'a, Tables>) -> Self {
    let staged = live.clone();
    Self { live, staged }
  }

  fn commit(self) {
    let MemoryTx { mut live, staged } = self;
    *live = staged;
  }
}

/// Process-local store for development and tests. Clones share the same
/// tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  tables: Arc<Mutex<Tables>>,
  #[cfg(any(test, feature = "test-utils"))]
  fail_next_cart_clear: Arc<AtomicBool>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds or replaces a catalog product.
  pub fn put_product(&self, product: Product) {
    self.tables.lock().products.insert(product.id, product);
  }

  /// Edits a catalog price in place, as a seller would.
  pub fn set_price(&self, product_id: i64, price_cents: i64) -> Result<()> {
    let mut tables = self.tables.lock();
    let product = tables
      .products
      .get_mut(&product_id)
      .ok_or_else(|| AppError::NotFound(format!("Product {} not found.", product_id)))?;
    product.price_cents = price_cents;
    product.updated_at = Utc::now();
    Ok(())
  }

  /// Makes the cart clear inside the next order placement fail.
  #[cfg(any(test, feature = "test-utils"))]
  pub fn fail_next_cart_clear(&self) {
    self.fail_next_cart_clear.store(true, Ordering::SeqCst);
  }

  pub fn order_count(&self) -> usize {
    self.tables.lock().orders.len()
  }

  pub fn payments_for_user(&self, user_id: i64) -> Vec<Payment> {
    self
      .tables
      .lock()
      .payments
      .iter()
      .filter(|p| p.user_id == user_id)
      .cloned()
      .collect()
  }
}

#[async_trait]
impl Catalog for MemoryStore {
  async fn find_product(&self, product_id: i64) -> Result<Option<Product>> {
    Ok(self.tables.lock().products.get(&product_id).cloned())
  }
}

#[async_trait]
impl CartStore for MemoryStore {
  async fn find_line(&self, user_id: i64, product_id: i64) -> Result<Option<CartLine>> {
    Ok(self.tables.lock().cart.get(&(user_id, product_id)).cloned())
  }

  async fn insert_line(&self, line: &NewCartLine) -> Result<CartLine> {
    let now = Utc::now();
    let mut tables = self.tables.lock();
    let row = tables
      .cart
      .entry((line.user_id, line.product_id))
      .and_modify(|existing| {
        existing.quantity = line.quantity;
        existing.updated_at = now;
      })
      .or_insert_with(|| CartLine {
        user_id: line.user_id,
        product_id: line.product_id,
        name: line.name.clone(),
        image_url: line.image_url.clone(),
        seller_id: line.seller_id,
        price_cents: line.price_cents,
        quantity: line.quantity,
        created_at: now,
        updated_at: now,
      });
    Ok(row.clone())
  }

  async fn update_quantity(&self, user_id: i64, product_id: i64, quantity: i32) -> Result<CartLine> {
    let mut tables = self.tables.lock();
    let line = tables
      .cart
      .get_mut(&(user_id, product_id))
      .ok_or_else(|| AppError::NotFound(format!("Cart line for product {} not found.", product_id)))?;
    line.quantity = quantity;
    line.updated_at = Utc::now();
    Ok(line.clone())
  }

  async fn delete_line(&self, user_id: i64, product_id: i64) -> Result<()> {
    self.tables.lock().cart.remove(&(user_id, product_id));
    Ok(())
  }

  async fn lines_for_user(&self, user_id: i64) -> Result<Vec<CartLine>> {
    let mut lines: Vec<CartLine> = self
      .tables
      .lock()
      .cart
      .range((user_id, i64::MIN)..=(user_id, i64::MAX))
      .map(|(_, line)| line.clone())
      .collect();
    lines.sort_by_key(|l| (l.created_at, l.product_id));
    Ok(lines)
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn place_order(&self, draft: &OrderDraft) -> Result<Order> {
    let mut tx = MemoryTx::begin(self.tables.lock());

    if tx.staged.orders.iter().any(|o| o.order_ref_number == draft.order_ref_number) {
      return Err(AppError::Conflict(
        "Uniqueness constraint 'orders_order_ref_number_key' violated".to_string(),
      ));
    }

    let now = Utc::now();
    tx.staged.next_order_id += 1;
    let order_id = tx.staged.next_order_id;
    let mut items = Vec::with_capacity(draft.items.len());
    for item in &draft.items {
      tx.staged.next_item_id += 1;
      items.push(OrderItem {
        id: tx.staged.next_item_id,
        order_id,
        product_id: item.product_id,
        name: item.name.clone(),
        image_url: item.image_url.clone(),
        seller_id: item.seller_id,
        price_cents: item.price_cents,
        quantity: item.quantity,
        created_at: now,
      });
    }
    let order = Order {
      id: order_id,
      user_id: draft.user_id,
      status: OrderStatus::Pending,
      amount_cents: draft.amount_cents,
      transaction_id: None,
      payment_id: draft.payment_id.clone(),
      order_ref_number: draft.order_ref_number.clone(),
      items,
      created_at: now,
      updated_at: now,
    };
    tx.staged.orders.push(order.clone());

    #[cfg(any(test, feature = "test-utils"))]
    if self.fail_next_cart_clear.swap(false, Ordering::SeqCst) {
      debug!(user_id = draft.user_id, "Injected cart clear failure, discarding staged order.");
      return Err(AppError::Storage(anyhow::anyhow!("cart clear failed")));
    }
    let cleared = tx.staged.clear_cart(draft.user_id);
    tx.commit();

    info!(order_id, cleared_lines = cleared, "Order stored in memory.");
    Ok(order)
  }

  async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>> {
    let mut orders: Vec<Order> = self
      .tables
      .lock()
      .orders
      .iter()
      .filter(|o| o.user_id == user_id)
      .cloned()
      .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(orders)
  }

  async fn find_order(&self, user_id: i64, order_ref: &str) -> Result<Option<Order>> {
    Ok(
      self
        .tables
        .lock()
        .orders
        .iter()
        .find(|o| o.user_id == user_id && o.order_ref_number == order_ref)
        .cloned(),
    )
  }

  async fn settle_orders(&self, payment_id: &str, status: OrderStatus) -> Result<u64> {
    let now = Utc::now();
    let mut changed = 0;
    for order in self.tables.lock().orders.iter_mut() {
      if order.payment_id.as_deref() == Some(payment_id) && order.status == OrderStatus::Pending {
        order.status = status;
        order.transaction_id = Some(payment_id.to_string());
        order.updated_at = now;
        changed += 1;
      }
    }
    Ok(changed)
  }
}

#[async_trait]
impl PaymentLedger for MemoryStore {
  async fn find_active_session(&self, user_id: i64) -> Result<Option<Payment>> {
    Ok(
      self
        .tables
        .lock()
        .payments
        .iter()
        .filter(|p| p.user_id == user_id && p.status.is_active())
        .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
        .cloned(),
    )
  }

  async fn find_by_session_id(&self, session_id: &str) -> Result<Option<Payment>> {
    Ok(self.tables.lock().payments.iter().find(|p| p.payment_id == session_id).cloned())
  }

  async fn record_session(&self, payment: &NewPayment) -> Result<Payment> {
    let mut tables = self.tables.lock();
    if tables
      .payments
      .iter()
      .any(|p| p.user_id == payment.user_id && p.status.is_active())
    {
      return Err(AppError::Conflict(
        "Uniqueness constraint 'payments_one_active_per_user' violated".to_string(),
      ));
    }
    if tables.payments.iter().any(|p| p.payment_id == payment.payment_id) {
      return Err(AppError::Conflict(
        "Uniqueness constraint 'payments_payment_id_key' violated".to_string(),
      ));
    }

    let now = Utc::now();
    tables.next_payment_id += 1;
    let row = Payment {
      id: tables.next_payment_id,
      user_id: payment.user_id,
      amount_cents: payment.amount_cents,
      order_ref: payment.order_ref.clone(),
      payment_id: payment.payment_id.clone(),
      payment_url: payment.payment_url.clone(),
      status: PaymentStatus::Initial,
      created_at: now,
      updated_at: now,
    };
    tables.payments.push(row.clone());
    Ok(row)
  }

  async fn update_status(&self, payment_id: i64, from: PaymentStatus, to: PaymentStatus) -> Result<Payment> {
    let mut tables = self.tables.lock();
    match tables.payments.iter_mut().find(|p| p.id == payment_id && p.status == from) {
      Some(payment) => {
        payment.status = to;
        payment.updated_at = Utc::now();
        Ok(payment.clone())
      }
      None => Err(AppError::Conflict(format!(
        "Payment {} is no longer '{}'.",
        payment_id,
        from.as_str()
      ))),
    }
  }
}
