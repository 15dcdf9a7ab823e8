// marketplace/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};

use super::AuthenticatedUser;
use crate::errors::AppError;
use crate::pipelines::order_pipeline;
use crate::state::AppState;

#[instrument(name = "handler::place_order", skip(app_state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn place_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order_ref = order_pipeline::place_order(app_state.get_ref(), auth_user.user_id).await?;
  info!(%order_ref, "Order placed.");
  Ok(HttpResponse::Created().json(json!({ "order_ref": order_ref })))
}

#[instrument(name = "handler::list_orders", skip(app_state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = order_pipeline::list_orders(app_state.get_ref(), auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(name = "handler::get_order", skip(app_state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let order = order_pipeline::get_order(app_state.get_ref(), auth_user.user_id, &path).await?;
  Ok(HttpResponse::Ok().json(order))
}
