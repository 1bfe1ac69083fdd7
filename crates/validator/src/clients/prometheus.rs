//! Prometheus client for querying platform metrics.
//!
//! The performance suite reads request rates, resource usage, and the
//! temperature gauge stream from here.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

/// Default Prometheus service URL (internal Kubernetes DNS).
const DEFAULT_PROMETHEUS_URL: &str = "http://prometheus.monitoring.svc.cluster.local:9090";

/// Configuration for the Prometheus client.
#[derive(Debug, Clone)]
pub struct PrometheusConfig {
    /// Base URL for the Prometheus API.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("PROMETHEUS_URL")
                .unwrap_or_else(|_| DEFAULT_PROMETHEUS_URL.to_string()),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PrometheusResponse {
    status: String,
    data: PrometheusData,
}

#[derive(Debug, Deserialize)]
struct PrometheusData {
    result: Vec<PrometheusResult>,
}

#[derive(Debug, Deserialize)]
struct PrometheusResult {
    metric: HashMap<String, String>,
    value: Option<(f64, String)>,
}

#[derive(Debug, Deserialize)]
struct PrometheusRangeResponse {
    status: String,
    data: PrometheusRangeData,
}

#[derive(Debug, Deserialize)]
struct PrometheusRangeData {
    result: Vec<PrometheusRangeResult>,
}

#[derive(Debug, Deserialize)]
struct PrometheusRangeResult {
    metric: HashMap<String, String>,
    #[serde(default)]
    values: Vec<(f64, String)>,
}

/// One series from a range query.
#[derive(Debug, Clone)]
pub struct RangeSeries {
    /// Labels associated with this series.
    pub labels: HashMap<String, String>,
    /// Chronological (timestamp, value) points.
    pub points: Vec<(DateTime<Utc>, f64)>,
}

/// A metric sample from an instant query.
#[derive(Debug, Clone)]
pub struct MetricSample {
    /// Labels associated with this series.
    pub labels: HashMap<String, String>,
    /// The sample value.
    pub value: f64,
    /// Timestamp of the sample.
    pub timestamp: DateTime<Utc>,
}

/// Prometheus client for instant queries.
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    config: PrometheusConfig,
    client: reqwest::Client,
}

impl PrometheusClient {
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: PrometheusConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build Prometheus HTTP client")?;
        Ok(Self { config, client })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Execute an instant query.
    ///
    /// # Errors
    /// Returns an error if the query fails or the response cannot be parsed.
    pub async fn query(&self, query: &str) -> Result<Vec<MetricSample>> {
        let url = format!("{}/api/v1/query", self.config.base_url.trim_end_matches('/'));

        debug!(query = %query, "Executing Prometheus query");

        let response = self
            .client
            .get(&url)
            .query(&[("query", query)])
            .send()
            .await
            .context("Failed to send request to Prometheus")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Prometheus query failed with status {status}: {body}");
        }

        let prom_response: PrometheusResponse = response
            .json()
            .await
            .context("Failed to parse Prometheus response")?;

        if prom_response.status != "success" {
            anyhow::bail!("Prometheus query returned status: {}", prom_response.status);
        }

        Ok(parse_results(&prom_response.data.result))
    }

    /// Execute a range query over `[start, end]` at the given step.
    ///
    /// # Errors
    /// Returns an error if the query fails or the response cannot be parsed.
    pub async fn query_range(
        &self,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> Result<Vec<RangeSeries>> {
        let url = format!(
            "{}/api/v1/query_range",
            self.config.base_url.trim_end_matches('/')
        );

        debug!(query = %query, "Executing Prometheus range query");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("query", query.to_string()),
                ("start", start.timestamp().to_string()),
                ("end", end.timestamp().to_string()),
                ("step", format!("{}s", step.as_secs().max(1))),
            ])
            .send()
            .await
            .context("Failed to send range query to Prometheus")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Prometheus range query failed with status {status}: {body}");
        }

        let prom_response: PrometheusRangeResponse = response
            .json()
            .await
            .context("Failed to parse Prometheus range response")?;

        if prom_response.status != "success" {
            anyhow::bail!(
                "Prometheus range query returned status: {}",
                prom_response.status
            );
        }

        Ok(parse_range_results(&prom_response.data.result))
    }

    /// Convenience for single-valued queries: the first sample's value, or
    /// `None` when the query matched no series.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn scalar(&self, query: &str) -> Result<Option<f64>> {
        let samples = self.query(query).await?;
        Ok(samples.first().map(|s| s.value))
    }

    /// Check Prometheus health without failing the caller on transport
    /// errors.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/-/healthy", self.config.base_url.trim_end_matches('/'));
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(error = %e, "Prometheus health check failed");
                false
            }
        }
    }
}

fn parse_results(results: &[PrometheusResult]) -> Vec<MetricSample> {
    let mut samples = Vec::new();

    for result in results {
        if let Some((timestamp, value_str)) = &result.value {
            let value: f64 = value_str.parse().unwrap_or(0.0);
            let ts = DateTime::from_timestamp(*timestamp as i64, 0).unwrap_or_else(Utc::now);

            samples.push(MetricSample {
                labels: result.metric.clone(),
                value,
                timestamp: ts,
            });
        }
    }

    samples
}

fn parse_range_results(results: &[PrometheusRangeResult]) -> Vec<RangeSeries> {
    results
        .iter()
        .map(|result| RangeSeries {
            labels: result.metric.clone(),
            points: result
                .values
                .iter()
                .map(|(timestamp, value_str)| {
                    (
                        DateTime::from_timestamp(*timestamp as i64, 0).unwrap_or_else(Utc::now),
                        value_str.parse().unwrap_or(0.0),
                    )
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_timeout() {
        let config = PrometheusConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(!config.base_url.is_empty());
    }

    #[test]
    fn test_parse_results_skips_valueless_series() {
        let results = vec![
            PrometheusResult {
                metric: HashMap::from([("pod".to_string(), "device-service-0".to_string())]),
                value: Some((1_700_000_000.0, "42.5".to_string())),
            },
            PrometheusResult {
                metric: HashMap::new(),
                value: None,
            },
        ];

        let samples = parse_results(&results);
        assert_eq!(samples.len(), 1);
        assert!((samples[0].value - 42.5).abs() < f64::EPSILON);
        assert_eq!(
            samples[0].labels.get("pod").map(String::as_str),
            Some("device-service-0")
        );
    }

    #[test]
    fn test_parse_range_results_keeps_point_order() {
        let results = vec![PrometheusRangeResult {
            metric: HashMap::from([("le".to_string(), "+Inf".to_string())]),
            values: vec![
                (1_700_000_000.0, "0.42".to_string()),
                (1_700_000_060.0, "0.93".to_string()),
            ],
        }];

        let series = parse_range_results(&results);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].points.len(), 2);
        assert!((series[0].points[0].1 - 0.42).abs() < f64::EPSILON);
        assert!((series[0].points[1].1 - 0.93).abs() < f64::EPSILON);
        assert!(series[0].points[0].0 < series[0].points[1].0);
    }
}
