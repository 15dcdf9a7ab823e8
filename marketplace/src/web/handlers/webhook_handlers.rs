// marketplace/src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::pipelines::reconcile_pipeline;
use crate::state::AppState;

/// Only the session id is read; the outcome itself is fetched from the
/// provider.
#[derive(Deserialize, Debug)]
pub struct PaymentWebhookPayload {
  pub session_id: String,
}

#[instrument(name = "handler::payment_webhook", skip(app_state, payload), fields(session_id = %payload.session_id))]
pub async fn payment_webhook_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<PaymentWebhookPayload>,
) -> Result<HttpResponse, AppError> {
  let session_id = payload.session_id.trim();
  if session_id.is_empty() {
    return Err(AppError::Validation("session_id must not be empty.".to_string()));
  }
  let payment = reconcile_pipeline::reconcile_session(app_state.get_ref(), session_id).await?;
  info!(status = payment.status.as_str(), "Payment webhook reconciled.");
  Ok(HttpResponse::Ok().json(json!({ "status": payment.status })))
}
