//! # Utility Modules
//!
//! Supporting utilities for logging setup and link observability.
//!
//! ## Components
//! - **Logging**: `tracing-subscriber` initialization from [`LoggingConfig`](crate::config::LoggingConfig)
//! - **Metrics**: Thread-safe counters for frames sent, received and dropped

pub mod logging;
pub mod metrics;

pub use metrics::{LinkMetrics, MetricsSnapshot};
