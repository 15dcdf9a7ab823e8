// core/src/lib.rs

//! Async step pipelines for the marketplace service.
//!
//! A pipeline is an ordered list of named steps. Each step may carry `before`,
//! `on` and `after` handlers that receive a shared [`ContextData<T>`] and decide
//! whether the run continues or stops early. Steps can be optional or skipped
//! by a predicate over the context.
//!
//! The [`Registry`] keys pipelines by their context type so callers only need
//! to build a context and hand it over:
//!
//! 1. Define a context struct `MyCtx`.
//! 2. Build a `Pipeline<MyCtx, MyError>` and attach handlers with `on_root`.
//! 3. Register it with `Registry::<MyError>::register_pipeline`.
//! 4. `registry.run(ContextData::new(ctx)).await`, then read results back out
//!    of the context.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::step::{Handler, SkipCondition, StepDef};
pub use crate::error::FlowError;
pub use crate::pipeline::Pipeline;
pub use crate::registry::Registry;
