// marketplace/src/web/handlers/mod.rs

pub mod auth;
pub mod cart_handlers;
pub mod order_handlers;
pub mod payment_handlers;
pub mod webhook_handlers;

pub use auth::AuthenticatedUser;
