//! HTTP clients for the systems a validation run talks to.

pub mod prometheus;
pub mod service;
pub mod vault;

pub use prometheus::{MetricSample, PrometheusClient, PrometheusConfig, RangeSeries};
pub use service::ServiceClient;
pub use vault::{TransitKeyInfo, VaultClient};
