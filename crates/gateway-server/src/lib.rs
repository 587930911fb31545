//! HTTP surface of the completion gateway.
//!
//! `POST /api/completions` answers with JSON or, when `stream` is true, with
//! server-sent events. `POST /api/completions/stream` always streams.
pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod observability;
pub mod sse;

pub use app::{AppState, build_harness, router, serve};
pub use config::ServerConfig;
pub use error::ApiError;
