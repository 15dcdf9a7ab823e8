// marketplace/src/pipelines/payment_pipeline.rs

use crate::errors::{AppError, Result};
use crate::models::{NewPayment, Payment};
use crate::pipelines::cart_pipeline::get_cart;
use crate::pipelines::contexts::OpenPaymentCtxData;
use crate::state::AppState;
use flow::{ContextData, Pipeline, PipelineControl, Registry};
use tracing::{info, instrument, warn};

pub fn register_open_payment_pipeline(registry: &Registry<AppError>) {
  let mut p = Pipeline::<OpenPaymentCtxData, AppError>::new(&[
    ("find_active_session", false, None),
    ("compute_cart_total", false, None),
    ("generate_order_reference", false, None),
    ("open_gateway_session", false, None),
    ("record_payment_session", false, None),
  ]);

  // Reuse stops the run: no second session is ever opened while one is live,
  // and a live session is never handed out for a different cart total.
  p.on_root("find_active_session", |ctx_data: ContextData<OpenPaymentCtxData>| {
    Box::pin(async move {
      let (app_state, user_id) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.user_id)
      };
      match app_state.payments.find_active_session(user_id).await? {
        Some(active) => {
          // An empty cart means the session's cart already became an order.
          let cart = get_cart(&app_state, user_id).await?;
          if !cart.is_empty() && cart.amount_cents != active.amount_cents {
            warn!(
              session_id = %active.payment_id,
              session_amount_cents = active.amount_cents,
              cart_amount_cents = cart.amount_cents,
              "Payment: cart total drifted from the active session, refusing reuse."
            );
            return Err(AppError::Conflict(
              "Cart total no longer matches the open payment session.".to_string(),
            ));
          }
          info!(session_id = %active.payment_id, "Payment: reusing active session.");
          let mut guard = ctx_data.write();
          guard.payment = Some(active);
          guard.reused = true;
          Ok(PipelineControl::Stop)
        }
        None => Ok::<_, AppError>(PipelineControl::Continue),
      }
    })
  });

  p.on_root("compute_cart_total", |ctx_data: ContextData<OpenPaymentCtxData>| {
    Box::pin(async move {
      let (app_state, user_id) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.user_id)
      };
      let cart = get_cart(&app_state, user_id).await?;
      if cart.is_empty() {
        warn!(user_id, "Payment: refused, cart is empty.");
        return Err(AppError::EmptyCart);
      }
      ctx_data.write().amount_cents = cart.amount_cents;
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("generate_order_reference", |ctx_data: ContextData<OpenPaymentCtxData>| {
    Box::pin(async move {
      let order_ref = ctx_data.read().app_state.order_refs.next_ref();
      ctx_data.write().order_ref = Some(order_ref);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("open_gateway_session", |ctx_data: ContextData<OpenPaymentCtxData>| {
    Box::pin(async move {
      let (app_state, user_id, amount_cents, order_ref) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.user_id, guard.amount_cents, guard.order_ref.clone())
      };
      let order_ref = order_ref.ok_or_else(|| AppError::Internal("Order reference was never assigned.".to_string()))?;
      let session = app_state.gateway.open_session(amount_cents, user_id, &order_ref).await?;
      info!(provider = app_state.gateway.name(), session_id = %session.session_id, amount_cents, "Payment: gateway session opened.");
      ctx_data.write().session = Some(session);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("record_payment_session", record_payment_session);

  registry.register_pipeline(p);
}

async fn record_payment_session(ctx_data: ContextData<OpenPaymentCtxData>) -> Result<PipelineControl> {
  let (app_state, user_id, amount_cents, order_ref, session) = {
    let guard = ctx_data.read();
    (
      guard.app_state.clone(),
      guard.user_id,
      guard.amount_cents,
      guard.order_ref.clone(),
      guard.session.clone(),
    )
  };
  let (order_ref, session) = order_ref
    .zip(session)
    .ok_or_else(|| AppError::Internal("Payment session was never opened.".to_string()))?;

  let new_payment = NewPayment {
    user_id,
    amount_cents,
    order_ref,
    payment_id: session.session_id.clone(),
    payment_url: session.redirect_url,
  };

  let payment = match app_state.payments.record_session(&new_payment).await {
    Ok(payment) => payment,
    Err(AppError::Conflict(_)) => {
      // Another process recorded a session first; hand out the winner's.
      let winner = app_state.payments.find_active_session(user_id).await?.ok_or_else(|| {
        AppError::Conflict("Payment session changed concurrently, please retry.".to_string())
      })?;
      warn!(
        orphaned_session_id = %session.session_id,
        session_id = %winner.payment_id,
        "Payment: lost the race to record a session, reusing the winner."
      );
      ctx_data.write().reused = true;
      winner
    }
    Err(e) => return Err(e),
  };

  info!(payment_id = payment.id, session_id = %payment.payment_id, "Payment: session recorded.");
  ctx_data.write().payment = Some(payment);
  Ok(PipelineControl::Continue)
}

/// Opens a hosted payment session for the cart, or returns the user's active
/// one. Serialized per user.
#[instrument(skip(app_state))]
pub async fn open_payment(app_state: &AppState, user_id: i64) -> Result<Payment> {
  let _user_guard = app_state.locks.acquire(user_id).await;

  let ctx_data = ContextData::new(OpenPaymentCtxData::new(app_state.clone(), user_id));
  app_state.registry.run(ctx_data.clone()).await?;

  let payment = ctx_data.write().payment.take();
  payment.ok_or_else(|| AppError::Internal("Payment pipeline finished without a session.".to_string()))
}
