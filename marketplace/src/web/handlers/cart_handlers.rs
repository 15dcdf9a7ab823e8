// marketplace/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};

use super::AuthenticatedUser;
use crate::errors::AppError;
use crate::pipelines::cart_pipeline;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct UpsertCartLinePayload {
  pub product_id: i64,
  /// Zero removes the product from the cart.
  pub qty: i32,
}

#[instrument(name = "handler::get_cart", skip(app_state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let cart = cart_pipeline::get_cart(app_state.get_ref(), auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(cart))
}

#[instrument(
  name = "handler::upsert_cart_line",
  skip(app_state, auth_user, payload),
  fields(user_id = auth_user.user_id, product_id = payload.product_id, qty = payload.qty)
)]
pub async fn upsert_cart_line_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<UpsertCartLinePayload>,
) -> Result<HttpResponse, AppError> {
  let cart = cart_pipeline::upsert_line(app_state.get_ref(), auth_user.user_id, payload.product_id, payload.qty).await?;
  info!(lines = cart.lines.len(), amount_cents = cart.amount_cents, "Cart updated.");
  Ok(HttpResponse::Ok().json(cart))
}
