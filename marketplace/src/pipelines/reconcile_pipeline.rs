// marketplace/src/pipelines/reconcile_pipeline.rs

use crate::errors::{AppError, Result};
use crate::models::{OrderStatus, Payment, PaymentStatus};
use crate::pipelines::contexts::{ReconcileCtxData, ReconcileTarget};
use crate::state::AppState;
use flow::{ContextData, Pipeline, PipelineControl, Registry, SkipCondition};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub fn register_reconcile_pipeline(registry: &Registry<AppError>) {
  let unchanged: SkipCondition<ReconcileCtxData> = Arc::new(|ctx_data: ContextData<ReconcileCtxData>| {
    let guard = ctx_data.read();
    match (&guard.payment, guard.gateway_status) {
      (Some(payment), Some(status)) => payment.status == status,
      _ => false,
    }
  });
  let not_settled: SkipCondition<ReconcileCtxData> = Arc::new(|ctx_data: ContextData<ReconcileCtxData>| {
    let guard = ctx_data.read();
    !guard.transitioned || !guard.gateway_status.is_some_and(PaymentStatus::is_terminal)
  });

  let mut p = Pipeline::<ReconcileCtxData, AppError>::new(&[
    ("load_payment", false, None),
    ("fetch_gateway_status", false, None),
    ("apply_transition", false, Some(unchanged)),
    ("settle_linked_orders", false, Some(not_settled)),
  ]);

  p.on_root("load_payment", |ctx_data: ContextData<ReconcileCtxData>| {
    Box::pin(async move {
      let (app_state, target) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.target.clone())
      };
      let payment = match &target {
        ReconcileTarget::Session(session_id) => app_state
          .payments
          .find_by_session_id(session_id)
          .await?
          .ok_or_else(|| AppError::NotFound(format!("Payment session {} not found.", session_id)))?,
        ReconcileTarget::ActiveFor(user_id) => app_state
          .payments
          .find_active_session(*user_id)
          .await?
          .ok_or_else(|| AppError::NotFound("No active payment session.".to_string()))?,
      };
      ctx_data.write().payment = Some(payment);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("fetch_gateway_status", |ctx_data: ContextData<ReconcileCtxData>| {
    Box::pin(async move {
      let (app_state, session_id) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.payment.as_ref().map(|p| p.payment_id.clone()))
      };
      let session_id = session_id.ok_or_else(|| AppError::Internal("Payment was never loaded.".to_string()))?;
      let status = app_state.gateway.session_status(&session_id).await?;
      info!(%session_id, gateway_status = status.as_str(), "Reconcile: gateway status fetched.");
      ctx_data.write().gateway_status = Some(status);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("apply_transition", apply_transition);

  p.on_root("settle_linked_orders", |ctx_data: ContextData<ReconcileCtxData>| {
    Box::pin(async move {
      let (app_state, session_id, status) = {
        let guard = ctx_data.read();
        (
          guard.app_state.clone(),
          guard.payment.as_ref().map(|p| p.payment_id.clone()),
          guard.gateway_status,
        )
      };
      let order_status = match status {
        Some(PaymentStatus::Success) => OrderStatus::Paid,
        Some(PaymentStatus::Failed) => OrderStatus::Failed,
        _ => return Ok(PipelineControl::Continue),
      };
      let session_id = session_id.ok_or_else(|| AppError::Internal("Payment was never loaded.".to_string()))?;
      let settled = app_state.orders.settle_orders(&session_id, order_status).await?;
      info!(%session_id, settled, order_status = ?order_status, "Reconcile: linked orders settled.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
}

async fn apply_transition(ctx_data: ContextData<ReconcileCtxData>) -> Result<PipelineControl> {
  let (app_state, payment, next) = {
    let guard = ctx_data.read();
    (guard.app_state.clone(), guard.payment.clone(), guard.gateway_status)
  };
  let (payment, next) = payment
    .zip(next)
    .ok_or_else(|| AppError::Internal("Reconcile state incomplete.".to_string()))?;

  if !payment.status.can_transition_to(next) {
    warn!(
      session_id = %payment.payment_id,
      from = payment.status.as_str(),
      to = next.as_str(),
      "Reconcile: refusing illegal status transition."
    );
    return Err(AppError::Conflict(format!(
      "Payment cannot move from '{}' to '{}'.",
      payment.status.as_str(),
      next.as_str()
    )));
  }

  let updated = match app_state.payments.update_status(payment.id, payment.status, next).await {
    Ok(updated) => updated,
    Err(AppError::Conflict(msg)) => {
      // A concurrent reconcile may already have applied the same outcome.
      let current = app_state.payments.find_by_session_id(&payment.payment_id).await?;
      match current {
        Some(current) if current.status == next => current,
        _ => return Err(AppError::Conflict(msg)),
      }
    }
    Err(e) => return Err(e),
  };

  info!(
    session_id = %updated.payment_id,
    from = payment.status.as_str(),
    to = updated.status.as_str(),
    "Reconcile: payment status updated."
  );
  let mut guard = ctx_data.write();
  guard.payment = Some(updated);
  guard.transitioned = true;
  Ok(PipelineControl::Continue)
}

async fn run_reconcile(app_state: &AppState, target: ReconcileTarget) -> Result<Payment> {
  let ctx_data = ContextData::new(ReconcileCtxData::new(app_state.clone(), target));
  app_state.registry.run(ctx_data.clone()).await?;

  let payment = ctx_data.write().payment.take();
  payment.ok_or_else(|| AppError::Internal("Reconcile pipeline finished without a payment.".to_string()))
}

/// Brings the ledger row for `session_id` in line with the gateway.
#[instrument(skip(app_state))]
pub async fn reconcile_session(app_state: &AppState, session_id: &str) -> Result<Payment> {
  run_reconcile(app_state, ReconcileTarget::Session(session_id.to_string())).await
}

/// Same as [`reconcile_session`] for the user's active session.
#[instrument(skip(app_state))]
pub async fn reconcile_active(app_state: &AppState, user_id: i64) -> Result<Payment> {
  run_reconcile(app_state, ReconcileTarget::ActiveFor(user_id)).await
}
