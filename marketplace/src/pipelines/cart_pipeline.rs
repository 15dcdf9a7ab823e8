// marketplace/src/pipelines/cart_pipeline.rs

use crate::errors::{AppError, Result};
use crate::models::cart_line::{cart_total_cents, line_total_cents};
use crate::models::{CartView, NewCartLine};
use crate::pipelines::contexts::UpsertCartLineCtxData;
use crate::state::AppState;
use flow::{ContextData, Pipeline, PipelineControl, Registry, SkipCondition};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub fn register_upsert_cart_line_pipeline(registry: &Registry<AppError>) {
  // Catalog is only consulted for a new line with a positive quantity.
  let skip_catalog: SkipCondition<UpsertCartLineCtxData> = Arc::new(|ctx_data: ContextData<UpsertCartLineCtxData>| {
    let guard = ctx_data.read();
    guard.existing_line.is_some() || guard.quantity == 0
  });

  let mut p = Pipeline::<UpsertCartLineCtxData, AppError>::new(&[
    ("validate_cart_input", false, None),
    ("load_existing_line", false, None),
    ("snapshot_catalog_product", false, Some(skip_catalog)),
    ("write_cart_line", false, None),
    ("load_cart", false, None),
  ]);

  p.on_root("validate_cart_input", |ctx_data: ContextData<UpsertCartLineCtxData>| {
    Box::pin(async move {
      let (product_id, quantity) = {
        let guard = ctx_data.read();
        (guard.product_id, guard.quantity)
      };
      if product_id <= 0 {
        warn!(product_id, "Cart: rejected non-positive product id.");
        return Err(AppError::Validation("Please provide a valid product id.".to_string()));
      }
      if quantity < 0 {
        warn!(quantity, "Cart: rejected negative quantity.");
        return Err(AppError::Validation("Quantity must not be negative.".to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("load_existing_line", |ctx_data: ContextData<UpsertCartLineCtxData>| {
    Box::pin(async move {
      let (app_state, user_id, product_id) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.user_id, guard.product_id)
      };
      let existing = app_state.cart.find_line(user_id, product_id).await?;
      debug!(found = existing.is_some(), "Cart: looked up existing line.");
      ctx_data.write().existing_line = existing;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("snapshot_catalog_product", |ctx_data: ContextData<UpsertCartLineCtxData>| {
    Box::pin(async move {
      let (app_state, product_id) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.product_id)
      };
      let product = app_state
        .catalog
        .find_product(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {} not found.", product_id)))?;
      ctx_data.write().product = Some(product);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("write_cart_line", |ctx_data: ContextData<UpsertCartLineCtxData>| {
    Box::pin(async move {
      let (app_state, user_id, product_id, quantity, existing_price, product) = {
        let guard = ctx_data.read();
        (
          guard.app_state.clone(),
          guard.user_id,
          guard.product_id,
          guard.quantity,
          guard.existing_line.as_ref().map(|l| l.price_cents),
          guard.product.clone(),
        )
      };

      match (existing_price, quantity) {
        (Some(_), 0) => {
          app_state.cart.delete_line(user_id, product_id).await?;
          info!(product_id, "Cart: line removed.");
        }
        (Some(price_cents), _) => {
          // Price snapshot stays as it was when the line was first added.
          ensure_total_fits(&app_state, user_id, product_id, price_cents, quantity).await?;
          app_state.cart.update_quantity(user_id, product_id, quantity).await?;
          info!(product_id, quantity, "Cart: quantity updated.");
        }
        (None, 0) => {
          debug!(product_id, "Cart: nothing to remove.");
        }
        (None, _) => {
          let product = product.ok_or_else(|| {
            AppError::Internal("Catalog snapshot missing for new cart line.".to_string())
          })?;
          ensure_total_fits(&app_state, user_id, product_id, product.price_cents, quantity).await?;
          let line = NewCartLine::snapshot(user_id, &product, quantity);
          app_state.cart.insert_line(&line).await?;
          info!(product_id, quantity, price_cents = product.price_cents, "Cart: line added.");
        }
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("load_cart", |ctx_data: ContextData<UpsertCartLineCtxData>| {
    Box::pin(async move {
      let (app_state, user_id) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.user_id)
      };
      let cart = get_cart(&app_state, user_id).await?;
      ctx_data.write().cart = Some(cart);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
}

/// Refuses a write whose line or cart total would not fit in an `i64`, so a
/// stored cart can always be totalled.
async fn ensure_total_fits(
  app_state: &AppState,
  user_id: i64,
  product_id: i64,
  price_cents: i64,
  quantity: i32,
) -> Result<()> {
  let others = app_state.cart.lines_for_user(user_id).await?;
  let others_total = cart_total_cents(others.iter().filter(|l| l.product_id != product_id))?;
  let line_total = line_total_cents(price_cents, quantity)?;
  if others_total.checked_add(line_total).is_none() {
    warn!(product_id, quantity, "Cart: rejected write, cart total would overflow.");
    return Err(AppError::Validation("Cart total is too large.".to_string()));
  }
  Ok(())
}

/// Adds, re-quantifies or (with `quantity == 0`) removes one cart line and
/// returns the resulting cart.
#[instrument(skip(app_state))]
pub async fn upsert_line(app_state: &AppState, user_id: i64, product_id: i64, quantity: i32) -> Result<CartView> {
  let ctx_data = ContextData::new(UpsertCartLineCtxData::new(
    app_state.clone(),
    user_id,
    product_id,
    quantity,
  ));
  app_state.registry.run(ctx_data.clone()).await?;

  let cart = ctx_data.write().cart.take();
  cart.ok_or_else(|| AppError::Internal("Cart pipeline finished without a cart.".to_string()))
}

pub async fn get_cart(app_state: &AppState, user_id: i64) -> Result<CartView> {
  let lines = app_state.cart.lines_for_user(user_id).await?;
  CartView::from_lines(lines)
}
