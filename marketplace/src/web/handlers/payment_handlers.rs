// marketplace/src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};

use super::AuthenticatedUser;
use crate::errors::AppError;
use crate::pipelines::{payment_pipeline, reconcile_pipeline};
use crate::state::AppState;

#[instrument(name = "handler::open_payment", skip(app_state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn open_payment_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let payment = payment_pipeline::open_payment(app_state.get_ref(), auth_user.user_id).await?;
  info!(session_id = %payment.payment_id, "Payment session ready.");
  Ok(HttpResponse::Ok().json(json!({ "payment_url": payment.payment_url })))
}

#[instrument(name = "handler::verify_payment", skip(app_state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn verify_payment_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let payment = reconcile_pipeline::reconcile_active(app_state.get_ref(), auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "status": payment.status })))
}
