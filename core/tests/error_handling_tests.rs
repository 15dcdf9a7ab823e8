// core/tests/error_handling_tests.rs
mod common;

use common::*;
use flow::{ContextData, FlowError, Pipeline, PipelineControl};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_required_step_without_handler_fails() {
  setup_tracing();
  let pipeline = Pipeline::<TestContext, TestError>::new(&[("missing", false, None)]);
  let result = pipeline.run(ContextData::new(TestContext::default())).await;

  match result.unwrap_err() {
    TestError::Flow(s) => {
      assert!(s.contains("HandlerMissing"));
      assert!(s.contains("missing"));
    }
    other => panic!("Expected TestError::Flow(HandlerMissing), got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_pipeline_with_flow_error_type() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, FlowError>::new(&[("task", false, None)]);
  pipeline.on_root("task", |ctx: ContextData<TestContext>| async move {
    ctx.write().counter = 1;
    Ok::<_, FlowError>(PipelineControl::Continue)
  });

  let ctx = ContextData::new(TestContext::default());
  assert!(pipeline.run(ctx.clone()).await.is_ok());
  assert_eq!(ctx.read().counter, 1);

  let mut failing = Pipeline::<TestContext, FlowError>::new(&[("fail_task", false, None)]);
  failing.on_root("fail_task", |_ctx: ContextData<TestContext>| async move {
    Err::<PipelineControl, _>(anyhow::anyhow!("gateway unreachable"))
  });
  match failing.run(ContextData::new(TestContext::default())).await.unwrap_err() {
    FlowError::HandlerError { source } => assert_eq!(source.to_string(), "gateway unreachable"),
    other => panic!("Expected FlowError::HandlerError, got {:?}", other),
  }
}
