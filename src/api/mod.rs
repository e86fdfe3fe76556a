//! HTTP API Module
//!
//! Record administration over JSON, name-server control, and the metrics
//! and monitoring endpoints.

mod routes;
mod metrics;

pub use routes::run_api_server;
pub use metrics::Metrics;
