//! HTTP middleware
//!
//! Author: hephaex@gmail.com

pub mod metrics;

pub use metrics::{endpoint_label, metrics_middleware, Metrics};
