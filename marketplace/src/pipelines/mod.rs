// marketplace/src/pipelines/mod.rs

//! Pipelines behind every cart, order and payment operation, plus the
//! functions handlers call to run them.

use crate::errors::AppError;
use flow::Registry;

pub mod contexts;

pub mod cart_pipeline;
pub mod order_pipeline;
pub mod payment_pipeline;
pub mod reconcile_pipeline;

/// Called once per `AppState`.
pub fn register_all_pipelines(registry: &Registry<AppError>) {
  tracing::info!("Registering pipelines...");

  cart_pipeline::register_upsert_cart_line_pipeline(registry);
  order_pipeline::register_place_order_pipeline(registry);
  payment_pipeline::register_open_payment_pipeline(registry);
  reconcile_pipeline::register_reconcile_pipeline(registry);

  tracing::info!("All application pipelines registered.");
}
