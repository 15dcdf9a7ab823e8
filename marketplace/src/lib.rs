// marketplace/src/lib.rs

//! Cart, order and payment-session backend for the marketplace.
//!
//! Every user-facing flow runs as a `flow::Pipeline` registered on the
//! [`state::AppState`] registry; storage and the payment provider sit behind
//! the traits in [`db`] and [`services::gateway`].

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod web;
