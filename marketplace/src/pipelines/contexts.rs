// marketplace/src/pipelines/contexts.rs

//! Root data of every pipeline. Handlers receive these wrapped in
//! `flow::ContextData`.

use crate::models::{CartLine, CartView, Order, Payment, PaymentStatus, Product};
use crate::services::GatewaySession;
use crate::state::AppState;

#[derive(Clone)]
pub struct UpsertCartLineCtxData {
  pub app_state: AppState,
  pub user_id: i64,
  pub product_id: i64,
  /// Zero removes the line.
  pub quantity: i32,
  pub existing_line: Option<CartLine>,
  pub product: Option<Product>,
  pub cart: Option<CartView>,
}

impl UpsertCartLineCtxData {
  pub fn new(app_state: AppState, user_id: i64, product_id: i64, quantity: i32) -> Self {
    Self {
      app_state,
      user_id,
      product_id,
      quantity,
      existing_line: None,
      product: None,
      cart: None,
    }
  }
}

#[derive(Clone)]
pub struct PlaceOrderCtxData {
  pub app_state: AppState,
  pub user_id: i64,
  pub lines: Vec<CartLine>,
  pub amount_cents: i64,
  /// Active payment session the order is placed against, if any.
  pub payment: Option<Payment>,
  pub order_ref: Option<String>,
  pub order: Option<Order>,
}

impl PlaceOrderCtxData {
  pub fn new(app_state: AppState, user_id: i64) -> Self {
    Self {
      app_state,
      user_id,
      lines: Vec::new(),
      amount_cents: 0,
      payment: None,
      order_ref: None,
      order: None,
    }
  }
}

#[derive(Clone)]
pub struct OpenPaymentCtxData {
  pub app_state: AppState,
  pub user_id: i64,
  pub amount_cents: i64,
  pub order_ref: Option<String>,
  pub session: Option<GatewaySession>,
  /// Set either to the reused active session or to the newly recorded one.
  pub payment: Option<Payment>,
  pub reused: bool,
}

impl OpenPaymentCtxData {
  pub fn new(app_state: AppState, user_id: i64) -> Self {
    Self {
      app_state,
      user_id,
      amount_cents: 0,
      order_ref: None,
      session: None,
      payment: None,
      reused: false,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileTarget {
  /// Gateway session id, as delivered by a webhook.
  Session(String),
  /// The active session of this user.
  ActiveFor(i64),
}

#[derive(Clone)]
pub struct ReconcileCtxData {
  pub app_state: AppState,
  pub target: ReconcileTarget,
  pub payment: Option<Payment>,
  pub gateway_status: Option<PaymentStatus>,
  /// True once the ledger row has been moved to `gateway_status`.
  pub transitioned: bool,
}

impl ReconcileCtxData {
  pub fn new(app_state: AppState, target: ReconcileTarget) -> Self {
    Self {
      app_state,
      target,
      payment: None,
      gateway_status: None,
      transitioned: false,
    }
  }
}
