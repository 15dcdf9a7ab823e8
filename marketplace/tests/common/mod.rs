// marketplace/tests/common/mod.rs
#![allow(dead_code)]

use chrono::Utc;
use marketplace::config::AppConfig;
use marketplace::db::MemoryStore;
use marketplace::models::Product;
use marketplace::services::{MockGateway, OrderRefGenerator, PaymentGateway};
use marketplace::state::AppState;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

pub const BUYER: i64 = 42;
pub const OTHER_BUYER: i64 = 77;

pub const MUG_ID: i64 = 1;
pub const MUG_PRICE: i64 = 1000;
pub const TEA_ID: i64 = 2;
pub const TEA_PRICE: i64 = 550;

static TRACING: Lazy<()> = Lazy::new(|| {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

pub struct TestApp {
  pub state: AppState,
  pub store: MemoryStore,
  pub gateway: Arc<MockGateway>,
}

pub fn product(id: i64, name: &str, price_cents: i64) -> Product {
  let now = Utc::now();
  Product {
    id,
    name: name.to_string(),
    description: None,
    image_url: format!("https://img.example/{}.png", id),
    price_cents,
    seller_id: 900 + id,
    stock: 10,
    created_at: now,
    updated_at: now,
  }
}

/// Memory store seeded with a mug (10.00) and a tea tin (5.50), plus the
/// mock gateway.
pub fn spawn_app() -> TestApp {
  setup_tracing();
  let config = AppConfig::from_lookup(|_| None).expect("default config");
  let store = MemoryStore::new();
  store.put_product(product(MUG_ID, "Mug", MUG_PRICE));
  store.put_product(product(TEA_ID, "Tea tin", TEA_PRICE));

  let gateway = Arc::new(MockGateway::new("http://localhost:8080/mock-checkout"));
  let dyn_gateway: Arc<dyn PaymentGateway> = gateway.clone();
  let state = AppState::new(config, store.clone(), dyn_gateway);

  TestApp { state, store, gateway }
}

/// Hands out the given references in order, then repeats the last one.
pub struct ScriptedOrderRefs {
  refs: Mutex<VecDeque<String>>,
  last: Mutex<String>,
}

impl ScriptedOrderRefs {
  pub fn new(refs: &[&str]) -> Self {
    Self {
      refs: Mutex::new(refs.iter().map(|r| r.to_string()).collect()),
      last: Mutex::new("00000000".to_string()),
    }
  }
}

impl OrderRefGenerator for ScriptedOrderRefs {
  fn next_ref(&self) -> String {
    let mut last = self.last.lock();
    if let Some(next) = self.refs.lock().pop_front() {
      *last = next;
    }
    last.clone()
  }
}

/// Same as [`spawn_app`], with order references drawn from `refs`.
pub fn spawn_app_with_order_refs(refs: &[&str]) -> TestApp {
  let mut app = spawn_app();
  app.state = app.state.with_order_refs(Arc::new(ScriptedOrderRefs::new(refs)));
  app
}

/// Two mugs and one tea tin: 25.50.
pub async fn fill_sample_cart(app: &TestApp, user_id: i64) {
  marketplace::pipelines::cart_pipeline::upsert_line(&app.state, user_id, MUG_ID, 2)
    .await
    .expect("add mug");
  marketplace::pipelines::cart_pipeline::upsert_line(&app.state, user_id, TEA_ID, 1)
    .await
    .expect("add tea");
}
