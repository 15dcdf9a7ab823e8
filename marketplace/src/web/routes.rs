// marketplace/src/web/routes.rs

use crate::errors::AppError;
use crate::web::handlers::{cart_handlers, order_handlers, payment_handlers, webhook_handlers};
use actix_web::{web, HttpResponse};
use serde_json::json;

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  // Malformed bodies get the same JSON error shape as every other failure.
  let json_config = web::JsonConfig::default()
    .error_handler(|err, _req| AppError::Validation(format!("Invalid request body: {}", err)).into());

  cfg.service(
    web::scope("/api/v1")
      .app_data(json_config)
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::resource("/cart")
          .route(web::get().to(cart_handlers::get_cart_handler))
          .route(web::post().to(cart_handlers::upsert_cart_line_handler)),
      )
      .route("/order", web::post().to(order_handlers::place_order_handler))
      .route("/orders", web::get().to(order_handlers::list_orders_handler))
      .route("/orders/{order_ref}", web::get().to(order_handlers::get_order_handler))
      .route("/payment", web::get().to(payment_handlers::open_payment_handler))
      .route("/payment/verify", web::post().to(payment_handlers::verify_payment_handler))
      .route("/webhooks/payment", web::post().to(webhook_handlers::payment_webhook_handler)),
  );
}
