// marketplace/tests/http_tests.rs

mod common;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use common::*;
use marketplace::models::PaymentStatus;
use marketplace::web::configure_app_routes;
use serde_json::{json, Value};

macro_rules! init_app {
  ($state:expr) => {
    test::init_service(
      App::new()
        .app_data(web::Data::new($state.clone()))
        .configure(configure_app_routes),
    )
    .await
  };
}

fn as_buyer(req: test::TestRequest) -> test::TestRequest {
  req.insert_header(("X-User-ID", BUYER.to_string()))
}

#[actix_web::test]
async fn health_needs_no_identity() {
  let app = spawn_app();
  let service = init_app!(app.state);
  let resp = test::call_service(&service, test::TestRequest::get().uri("/api/v1/health").to_request()).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn missing_or_invalid_identity_is_unauthorized() {
  let app = spawn_app();
  let service = init_app!(app.state);

  let resp = test::call_service(&service, test::TestRequest::get().uri("/api/v1/cart").to_request()).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "unauthorized");

  let req = test::TestRequest::get()
    .uri("/api/v1/cart")
    .insert_header(("X-User-ID", "-3"))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn checkout_flow_over_http() {
  let app = spawn_app();
  let service = init_app!(app.state);

  for (product_id, qty) in [(MUG_ID, 2), (TEA_ID, 1)] {
    let req = as_buyer(test::TestRequest::post().uri("/api/v1/cart"))
      .set_json(json!({ "product_id": product_id, "qty": qty }))
      .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  let cart: Value = test::call_and_read_body_json(&service, as_buyer(test::TestRequest::get().uri("/api/v1/cart")).to_request()).await;
  assert_eq!(cart["amount_cents"], 2550);
  assert_eq!(cart["lines"].as_array().map(Vec::len), Some(2));

  let first: Value =
    test::call_and_read_body_json(&service, as_buyer(test::TestRequest::get().uri("/api/v1/payment")).to_request()).await;
  let second: Value =
    test::call_and_read_body_json(&service, as_buyer(test::TestRequest::get().uri("/api/v1/payment")).to_request()).await;
  assert!(first["payment_url"].is_string());
  assert_eq!(first["payment_url"], second["payment_url"]);

  let resp = test::call_service(&service, as_buyer(test::TestRequest::post().uri("/api/v1/order")).to_request()).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let placed: Value = test::read_body_json(resp).await;
  let order_ref = placed["order_ref"].as_str().unwrap().to_string();

  let order: Value = test::call_and_read_body_json(
    &service,
    as_buyer(test::TestRequest::get().uri(&format!("/api/v1/orders/{}", order_ref))).to_request(),
  )
  .await;
  assert_eq!(order["amount_cents"], 2550);
  assert_eq!(order["status"], "pending");

  let session_id = app.store.payments_for_user(BUYER)[0].payment_id.clone();
  app.gateway.set_outcome(&session_id, PaymentStatus::Success);
  let req = test::TestRequest::post()
    .uri("/api/v1/webhooks/payment")
    .set_json(json!({ "session_id": session_id }))
    .to_request();
  let hook: Value = test::call_and_read_body_json(&service, req).await;
  assert_eq!(hook["status"], "success");

  let orders: Value =
    test::call_and_read_body_json(&service, as_buyer(test::TestRequest::get().uri("/api/v1/orders")).to_request()).await;
  assert_eq!(orders["orders"][0]["status"], "paid");
}

#[actix_web::test]
async fn empty_cart_and_gateway_outage_are_distinguishable() {
  let app = spawn_app();
  let service = init_app!(app.state);

  let resp = test::call_service(&service, as_buyer(test::TestRequest::post().uri("/api/v1/order")).to_request()).await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "empty_cart");
  assert_eq!(body["retryable"], false);

  fill_sample_cart(&app, BUYER).await;
  app.gateway.set_unavailable(true);
  let resp = test::call_service(&service, as_buyer(test::TestRequest::get().uri("/api/v1/payment")).to_request()).await;
  assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "upstream_failure");
  assert_eq!(body["retryable"], true);
}

#[actix_web::test]
async fn malformed_body_is_a_bad_request() {
  let app = spawn_app();
  let service = init_app!(app.state);

  let req = as_buyer(test::TestRequest::post().uri("/api/v1/cart"))
    .set_json(json!({ "product_id": "mug" }))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "invalid_input");
}

#[actix_web::test]
async fn unknown_order_ref_is_not_found() {
  let app = spawn_app();
  let service = init_app!(app.state);
  let resp = test::call_service(
    &service,
    as_buyer(test::TestRequest::get().uri("/api/v1/orders/00000000")).to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
