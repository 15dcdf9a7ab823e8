// marketplace/src/db/mod.rs

//! Storage seams. `PgStore` is the production backend, `MemoryStore` backs
//! local runs without `DATABASE_URL` and the test suite.

pub mod memory;
pub mod postgres;

use crate::errors::Result;
use crate::models::{
  CartLine, NewCartLine, NewPayment, Order, OrderDraft, OrderStatus, Payment, PaymentStatus, Product,
};
use async_trait::async_trait;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Catalog: Send + Sync {
  async fn find_product(&self, product_id: i64) -> Result<Option<Product>>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
  async fn find_line(&self, user_id: i64, product_id: i64) -> Result<Option<CartLine>>;

  /// Inserts a snapshot line. If the line appeared concurrently only its
  /// quantity is overwritten.
  async fn insert_line(&self, line: &NewCartLine) -> Result<CartLine>;

  /// Quantity only; snapshot columns are left alone. `NotFound` if the line
  /// is gone.
  async fn update_quantity(&self, user_id: i64, product_id: i64, quantity: i32) -> Result<CartLine>;

  async fn delete_line(&self, user_id: i64, product_id: i64) -> Result<()>;

  /// Oldest line first.
  async fn lines_for_user(&self, user_id: i64) -> Result<Vec<CartLine>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Writes the order, its items and clears the user's cart as one unit.
  /// A reused `order_ref_number` fails with `Conflict` and writes nothing.
  async fn place_order(&self, draft: &OrderDraft) -> Result<Order>;

  /// Newest first, items included.
  async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>>;

  async fn find_order(&self, user_id: i64, order_ref: &str) -> Result<Option<Order>>;

  /// Moves still-pending orders placed against gateway session `payment_id`
  /// to `status`. Returns how many orders changed.
  async fn settle_orders(&self, payment_id: &str, status: OrderStatus) -> Result<u64>;
}

#[async_trait]
pub trait PaymentLedger: Send + Sync {
  /// Newest unresolved (`initial` or `pending`) payment of the user, if any.
  async fn find_active_session(&self, user_id: i64) -> Result<Option<Payment>>;

  async fn find_by_session_id(&self, session_id: &str) -> Result<Option<Payment>>;

  /// Inserts in `initial`. `Conflict` if the user already has an active
  /// session.
  async fn record_session(&self, payment: &NewPayment) -> Result<Payment>;

  /// Compare-and-set: succeeds only while the row is still in `from`,
  /// otherwise `Conflict`.
  async fn update_status(&self, payment_id: i64, from: PaymentStatus, to: PaymentStatus) -> Result<Payment>;
}
