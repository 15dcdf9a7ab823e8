// marketplace/src/state.rs

use crate::config::AppConfig;
use crate::db::{CartStore, Catalog, OrderStore, PaymentLedger};
use crate::errors::AppError;
use crate::pipelines;
use crate::services::{OrderRefGenerator, PaymentGateway, RandomOrderRefs, UserLocks};
use flow::Registry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub catalog: Arc<dyn Catalog>,
  pub cart: Arc<dyn CartStore>,
  pub orders: Arc<dyn OrderStore>,
  pub payments: Arc<dyn PaymentLedger>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub order_refs: Arc<dyn OrderRefGenerator>,
  pub locks: Arc<UserLocks>,
  pub registry: Arc<Registry<AppError>>,
}

impl AppState {
  /// Wires one store for every storage seam and registers all pipelines.
  pub fn new<S>(config: AppConfig, store: S, gateway: Arc<dyn PaymentGateway>) -> Self
  where
    S: Catalog + CartStore + OrderStore + PaymentLedger + 'static,
  {
    let store = Arc::new(store);
    let registry = Arc::new(Registry::<AppError>::new());
    pipelines::register_all_pipelines(&registry);

    Self {
      config: Arc::new(config),
      catalog: store.clone(),
      cart: store.clone(),
      orders: store.clone(),
      payments: store,
      gateway,
      order_refs: Arc::new(RandomOrderRefs),
      locks: Arc::new(UserLocks::new()),
      registry,
    }
  }

  /// Replaces the random order reference source.
  pub fn with_order_refs(mut self, order_refs: Arc<dyn OrderRefGenerator>) -> Self {
    self.order_refs = order_refs;
    self
  }
}
