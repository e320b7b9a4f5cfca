//! # Middleware Module
//!
//! Hooks run around every dispatched request. `before` may short-circuit with its own
//! response; `after` sees the final response (including 404/405 aborts) and latency.

mod core;
mod metrics;
mod tracing;

pub use core::Middleware;
pub use metrics::MetricsMiddleware;
pub use tracing::TracingMiddleware;
