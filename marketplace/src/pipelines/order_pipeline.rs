// marketplace/src/pipelines/order_pipeline.rs

use crate::errors::{AppError, Result};
use crate::models::cart_line::cart_total_cents;
use crate::models::{Order, OrderDraft};
use crate::pipelines::contexts::PlaceOrderCtxData;
use crate::state::AppState;
use flow::{ContextData, Pipeline, PipelineControl, Registry, SkipCondition};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Fresh references tried before a placement gives up on collisions.
pub const MAX_ORDER_REF_ATTEMPTS: usize = 5;

pub fn register_place_order_pipeline(registry: &Registry<AppError>) {
  // A correlated payment session already fixed the reference.
  let has_ref: SkipCondition<PlaceOrderCtxData> = Arc::new(|ctx_data: ContextData<PlaceOrderCtxData>| {
    let assigned = ctx_data.read().order_ref.is_some();
    assigned
  });

  let mut p = Pipeline::<PlaceOrderCtxData, AppError>::new(&[
    ("load_cart_for_order", false, None),
    ("correlate_payment_session", false, None),
    ("assign_order_reference", false, Some(has_ref)),
    ("persist_order", false, None),
  ]);

  p.on_root("load_cart_for_order", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let (app_state, user_id) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.user_id)
      };
      let lines = app_state.cart.lines_for_user(user_id).await?;
      if lines.is_empty() {
        warn!(user_id, "Order: refused, cart is empty.");
        return Err(AppError::EmptyCart);
      }

      let amount_cents = cart_total_cents(&lines)?;
      let mut guard = ctx_data.write();
      guard.amount_cents = amount_cents;
      guard.lines = lines;
      info!(lines = guard.lines.len(), amount_cents = guard.amount_cents, "Order: cart loaded.");
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("correlate_payment_session", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let (app_state, user_id, amount_cents) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.user_id, guard.amount_cents)
      };
      let Some(payment) = app_state.payments.find_active_session(user_id).await? else {
        info!("Order: no active payment session, placing uncorrelated order.");
        return Ok(PipelineControl::Continue);
      };

      if payment.amount_cents != amount_cents {
        warn!(
          session_amount_cents = payment.amount_cents,
          cart_amount_cents = amount_cents,
          "Order: cart total drifted from the active payment session."
        );
        return Err(AppError::Conflict(
          "Cart total no longer matches the open payment session.".to_string(),
        ));
      }

      info!(session_id = %payment.payment_id, order_ref = %payment.order_ref, "Order: correlated with active payment session.");
      let mut guard = ctx_data.write();
      guard.order_ref = Some(payment.order_ref.clone());
      guard.payment = Some(payment);
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("assign_order_reference", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let order_ref = ctx_data.read().app_state.order_refs.next_ref();
      ctx_data.write().order_ref = Some(order_ref);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("persist_order", persist_order);

  registry.register_pipeline(p);
}

async fn persist_order(ctx_data: ContextData<PlaceOrderCtxData>) -> Result<PipelineControl> {
  let (app_state, user_id, lines, order_ref, payment_id) = {
    let guard = ctx_data.read();
    (
      guard.app_state.clone(),
      guard.user_id,
      guard.lines.clone(),
      guard.order_ref.clone(),
      guard.payment.as_ref().map(|p| p.payment_id.clone()),
    )
  };
  let correlated = payment_id.is_some();
  let mut order_ref = order_ref.ok_or_else(|| AppError::Internal("Order reference was never assigned.".to_string()))?;

  for attempt in 1..=MAX_ORDER_REF_ATTEMPTS {
    let draft = OrderDraft::from_cart(user_id, &lines, order_ref.clone(), payment_id.clone())?;
    match app_state.orders.place_order(&draft).await {
      Ok(order) => {
        info!(order_id = order.id, order_ref = %order.order_ref_number, attempt, "Order: placed.");
        ctx_data.write().order = Some(order);
        return Ok(PipelineControl::Continue);
      }
      Err(AppError::Conflict(_)) if correlated => {
        warn!(%order_ref, "Order: active payment session already has an order.");
        return Err(AppError::Conflict(
          "An order was already placed for the open payment session.".to_string(),
        ));
      }
      Err(AppError::Conflict(_)) => {
        warn!(%order_ref, attempt, "Order: reference collision, retrying with a fresh one.");
        order_ref = app_state.order_refs.next_ref();
      }
      Err(e) => {
        // The transaction rolled back: no order row, cart untouched.
        error!(alert = "order_transaction_failed", user_id, %order_ref, error = %e, "Order: placement failed.");
        return Err(e);
      }
    }
  }

  error!(alert = "order_ref_exhausted", user_id, "Order: no free order reference found.");
  Err(AppError::Conflict("Could not allocate an order reference, please retry.".to_string()))
}

/// Turns the user's cart into an order and returns its reference.
#[instrument(skip(app_state))]
pub async fn place_order(app_state: &AppState, user_id: i64) -> Result<String> {
  let ctx_data = ContextData::new(PlaceOrderCtxData::new(app_state.clone(), user_id));
  app_state.registry.run(ctx_data.clone()).await?;

  let guard = ctx_data.read();
  guard
    .order
    .as_ref()
    .map(|o| o.order_ref_number.clone())
    .ok_or_else(|| AppError::Internal("Order pipeline finished without an order.".to_string()))
}

pub async fn list_orders(app_state: &AppState, user_id: i64) -> Result<Vec<Order>> {
  app_state.orders.orders_for_user(user_id).await
}

/// `NotFound` covers both an unknown reference and another user's order.
pub async fn get_order(app_state: &AppState, user_id: i64, order_ref: &str) -> Result<Order> {
  app_state
    .orders
    .find_order(user_id, order_ref)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_ref)))
}
