// core/tests/registry_tests.rs
mod common;

use common::*;
use flow::{ContextData, FlowError, Pipeline, PipelineControl, PipelineResult, Registry};

#[derive(Clone, Debug, Default)]
struct CartCtx {
  lines: u32,
}

#[derive(Clone, Debug, Default)]
struct PaymentCtx {
  url: Option<String>,
}

#[tokio::test]
async fn test_registry_dispatches_by_context_type() {
  setup_tracing();
  let registry = Registry::<TestError>::new();

  let mut cart = Pipeline::<CartCtx, TestError>::new(&[("add_line", false, None)]);
  cart.on_root("add_line", |ctx: ContextData<CartCtx>| async move {
    ctx.write().lines += 1;
    Ok::<_, FlowError>(PipelineControl::Continue)
  });
  registry.register_pipeline(cart);

  let mut payment = Pipeline::<PaymentCtx, TestError>::new(&[("open_session", false, None)]);
  payment.on_root("open_session", |ctx: ContextData<PaymentCtx>| async move {
    ctx.write().url = Some("https://pay.example/s/1".to_string());
    Ok::<_, FlowError>(PipelineControl::Continue)
  });
  registry.register_pipeline(payment);

  assert!(registry.is_registered::<CartCtx>());
  assert!(registry.is_registered::<PaymentCtx>());

  let cart_ctx = ContextData::new(CartCtx::default());
  assert_eq!(registry.run(cart_ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(cart_ctx.read().lines, 1);

  let payment_ctx = ContextData::new(PaymentCtx::default());
  assert_eq!(registry.run(payment_ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(payment_ctx.read().url.as_deref(), Some("https://pay.example/s/1"));
}

#[tokio::test]
async fn test_registry_reports_unregistered_context() {
  setup_tracing();
  let registry = Registry::<TestError>::new();
  let result = registry.run(ContextData::new(CartCtx::default())).await;

  match result.unwrap_err() {
    TestError::Flow(s) => {
      assert!(s.contains("NotRegistered"));
      assert!(s.contains("CartCtx"));
    }
    other => panic!("Expected TestError::Flow(NotRegistered), got {:?}", other),
  }
}

#[tokio::test]
async fn test_registry_propagates_handler_error() {
  setup_tracing();
  let registry = Registry::<TestError>::new();
  let mut p = Pipeline::<CartCtx, TestError>::new(&[("fail", false, None)]);
  p.on_root("fail", |_ctx: ContextData<CartCtx>| async move {
    Err::<PipelineControl, _>(TestError::Handler("product not found".to_string()))
  });
  registry.register_pipeline(p);

  let result = registry.run(ContextData::new(CartCtx::default())).await;
  assert_eq!(result.unwrap_err(), TestError::Handler("product not found".to_string()));
}
