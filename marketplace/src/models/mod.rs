// marketplace/src/models/mod.rs

//! Rows of the marketplace tables and the values built from them.

pub mod cart_line;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod product;

pub use cart_line::{CartLine, CartView, NewCartLine};
pub use order::{Order, OrderDraft, OrderStatus};
pub use order_item::OrderItem;
pub use payment::{NewPayment, Payment, PaymentStatus};
pub use product::Product;
