//! Performance checks.
//!
//! Latency is measured directly with a concurrent probe fan-out; request
//! error rate and resource usage come from Prometheus. Observed values are
//! classified against the run's threshold policy, so warn boundaries produce
//! CONDITIONAL results with a scaled score instead of a hard failure.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use harness::{CheckResult, Suite, Threshold, ThresholdBreach};
use tracing::debug;

use super::{elapsed_ms, fail_from_error, fail_unresolved, Check, CheckContext};

const SUITE: Suite = Suite::Performance;

/// Simulated concurrent users for the latency probe.
const CONCURRENT_PROBES: usize = 20;

/// The performance suite.
#[must_use]
pub fn checks() -> Vec<Box<dyn Check>> {
    vec![
        Box::new(HealthLatency),
        Box::new(ErrorRate),
        Box::new(CpuUsage),
        Box::new(MemoryUsage),
        Box::new(TemperatureMetrics),
    ]
}

/// P95 of the sorted sample set, in milliseconds.
fn p95_ms(latencies: &mut [Duration]) -> f64 {
    if latencies.is_empty() {
        return 0.0;
    }
    latencies.sort_unstable();
    let rank = (latencies.len() as f64 * 0.95).ceil() as usize;
    latencies[rank.saturating_sub(1).min(latencies.len() - 1)].as_secs_f64() * 1000.0
}

/// Map a classified observation onto a result.
fn classify(
    name: String,
    started: Instant,
    threshold: Threshold,
    observed: f64,
    detail: String,
) -> CheckResult {
    match threshold.breach(observed) {
        ThresholdBreach::None => CheckResult::pass(name, SUITE, elapsed_ms(started), detail),
        ThresholdBreach::Warn => {
            let score = threshold.score(observed);
            CheckResult::conditional(name, SUITE, elapsed_ms(started), detail).with_score(score)
        }
        ThresholdBreach::Fail => CheckResult::fail(name, SUITE, elapsed_ms(started), detail),
    }
}

/// Concurrent `GET /health` rounds against temperature-service, judged on
/// P95 latency.
struct HealthLatency;

#[async_trait]
impl Check for HealthLatency {
    fn name(&self) -> String {
        "health-latency".into()
    }

    fn suite(&self) -> Suite {
        SUITE
    }

    async fn run(&self, ctx: &CheckContext) -> CheckResult {
        let name = self.name();
        let started = Instant::now();
        let service = "temperature-service";

        let client = match ctx.service_client(service) {
            Ok(Some(client)) => client,
            Ok(None) => return fail_unresolved(&name, SUITE, service),
            Err(e) => return fail_from_error(&name, SUITE, started, &e),
        };
        let path = crate::config::service(service)
            .map_or_else(|| "/health".to_string(), |spec| spec.route("/health"));

        let probes = (0..CONCURRENT_PROBES).map(|_| {
            let client = client.clone();
            let path = path.clone();
            async move { client.get_status(&path).await }
        });
        let outcomes = join_all(probes).await;

        let mut latencies = Vec::with_capacity(outcomes.len());
        let mut errors = 0_usize;
        for outcome in outcomes {
            match outcome {
                Ok((status, latency)) if status.as_u16() == 200 => latencies.push(latency),
                Ok(_) | Err(_) => errors += 1,
            }
        }
        debug!(samples = latencies.len(), errors, "Latency fan-out complete");

        if errors > 0 {
            return CheckResult::fail(
                name,
                SUITE,
                elapsed_ms(started),
                format!("{errors}/{CONCURRENT_PROBES} concurrent probes failed"),
            );
        }

        let p95 = p95_ms(&mut latencies);
        let mut detail = format!("p95 {p95:.0} ms over {CONCURRENT_PROBES} concurrent probes");
        if let Some(history) = latency_history(ctx).await {
            detail.push_str("; ");
            detail.push_str(&history);
        }

        let threshold = ctx.policy.thresholds.get("latency_p95_ms");
        classify(name, started, threshold, p95, detail)
    }
}

/// Best-effort p95 history line from Prometheus, absent when it cannot
/// answer or the platform exports no request duration histogram.
async fn latency_history(ctx: &CheckContext) -> Option<String> {
    if !ctx.prometheus.health_check().await {
        return None;
    }

    let namespace = ctx.cluster.namespace();
    let query = format!(
        "histogram_quantile(0.95, \
         sum(rate(http_request_duration_seconds_bucket{{namespace=\"{namespace}\"}}[5m])) by (le))"
    );
    let end = Utc::now();
    let start = end - chrono::Duration::minutes(15);
    let series = ctx
        .prometheus
        .query_range(&query, start, end, Duration::from_secs(60))
        .await
        .ok()?;

    let peak = series
        .first()?
        .points
        .iter()
        .map(|(_, seconds)| seconds * 1000.0)
        .fold(f64::NAN, f64::max);
    if peak.is_nan() {
        return None;
    }
    Some(format!("history p95 peaked at {peak:.0} ms over 15m"))
}

/// 5xx share of request traffic over the last five minutes.
struct ErrorRate;

#[async_trait]
impl Check for ErrorRate {
    fn name(&self) -> String {
        "error-rate".into()
    }

    fn suite(&self) -> Suite {
        SUITE
    }

    async fn run(&self, ctx: &CheckContext) -> CheckResult {
        let name = self.name();
        if !ctx.prometheus.health_check().await {
            return CheckResult::skip(
                name,
                SUITE,
                format!("Prometheus unreachable at {}", ctx.prometheus.base_url()),
            );
        }

        let started = Instant::now();
        let namespace = ctx.cluster.namespace();
        let query = format!(
            "100 * sum(rate(http_requests_total{{namespace=\"{namespace}\",status=~\"5..\"}}[5m])) \
             / sum(rate(http_requests_total{{namespace=\"{namespace}\"}}[5m]))"
        );

        match ctx.prometheus.scalar(&query).await {
            Ok(Some(rate)) => {
                let threshold = ctx.policy.thresholds.get("error_rate_percent");
                classify(
                    name,
                    started,
                    threshold,
                    rate,
                    format!("{rate:.2}% 5xx over 5m"),
                )
            }
            Ok(None) => CheckResult::pass(
                name,
                SUITE,
                elapsed_ms(started),
                "no request traffic observed over 5m",
            ),
            Err(e) => fail_from_error(&name, SUITE, started, &e),
        }
    }
}

/// Container CPU usage against limits.
struct CpuUsage;

#[async_trait]
impl Check for CpuUsage {
    fn name(&self) -> String {
        "cpu-usage".into()
    }

    fn suite(&self) -> Suite {
        SUITE
    }

    async fn run(&self, ctx: &CheckContext) -> CheckResult {
        let name = self.name();
        if !ctx.prometheus.health_check().await {
            return CheckResult::skip(
                name,
                SUITE,
                format!("Prometheus unreachable at {}", ctx.prometheus.base_url()),
            );
        }

        let started = Instant::now();
        let namespace = ctx.cluster.namespace();
        let query = format!(
            "100 * sum(rate(container_cpu_usage_seconds_total{{namespace=\"{namespace}\",container!=\"\"}}[5m])) \
             / sum(kube_pod_container_resource_limits{{namespace=\"{namespace}\",resource=\"cpu\"}})"
        );

        match ctx.prometheus.scalar(&query).await {
            Ok(Some(percent)) => {
                let threshold = ctx.policy.thresholds.get("cpu_percent");
                classify(
                    name,
                    started,
                    threshold,
                    percent,
                    format!("{percent:.1}% of CPU limits"),
                )
            }
            Ok(None) => CheckResult::conditional(
                name,
                SUITE,
                elapsed_ms(started),
                "no CPU usage series for the namespace",
            ),
            Err(e) => fail_from_error(&name, SUITE, started, &e),
        }
    }
}

/// Container working-set memory against limits.
struct MemoryUsage;

#[async_trait]
impl Check for MemoryUsage {
    fn name(&self) -> String {
        "memory-usage".into()
    }

    fn suite(&self) -> Suite {
        SUITE
    }

    async fn run(&self, ctx: &CheckContext) -> CheckResult {
        let name = self.name();
        if !ctx.prometheus.health_check().await {
            return CheckResult::skip(
                name,
                SUITE,
                format!("Prometheus unreachable at {}", ctx.prometheus.base_url()),
            );
        }

        let started = Instant::now();
        let namespace = ctx.cluster.namespace();
        let query = format!(
            "100 * sum(container_memory_working_set_bytes{{namespace=\"{namespace}\",container!=\"\"}}) \
             / sum(kube_pod_container_resource_limits{{namespace=\"{namespace}\",resource=\"memory\"}})"
        );

        match ctx.prometheus.scalar(&query).await {
            Ok(Some(percent)) => {
                let threshold = ctx.policy.thresholds.get("memory_percent");
                classify(
                    name,
                    started,
                    threshold,
                    percent,
                    format!("{percent:.1}% of memory limits"),
                )
            }
            Ok(None) => CheckResult::conditional(
                name,
                SUITE,
                elapsed_ms(started),
                "no memory usage series for the namespace",
            ),
            Err(e) => fail_from_error(&name, SUITE, started, &e),
        }
    }
}

/// The temperature gauge stream is live.
struct TemperatureMetrics;

#[async_trait]
impl Check for TemperatureMetrics {
    fn name(&self) -> String {
        "temperature-metrics".into()
    }

    fn suite(&self) -> Suite {
        SUITE
    }

    async fn run(&self, ctx: &CheckContext) -> CheckResult {
        let name = self.name();
        if !ctx.prometheus.health_check().await {
            return CheckResult::skip(
                name,
                SUITE,
                format!("Prometheus unreachable at {}", ctx.prometheus.base_url()),
            );
        }

        let started = Instant::now();
        match ctx.prometheus.query("grill_stats_temperature_celsius").await {
            Ok(samples) if !samples.is_empty() => {
                let latest = samples
                    .iter()
                    .max_by_key(|s| s.timestamp)
                    .map_or(0.0, |s| s.value);
                CheckResult::pass(
                    name,
                    SUITE,
                    elapsed_ms(started),
                    format!("{} probe series, latest {latest:.1}°C", samples.len()),
                )
            }
            Ok(_) => CheckResult::fail(
                name,
                SUITE,
                elapsed_ms(started),
                "grill_stats_temperature_celsius has no samples",
            ),
            Err(e) => fail_from_error(&name, SUITE, started, &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p95_of_uniform_samples() {
        let mut samples: Vec<Duration> = (1..=100).map(Duration::from_millis).collect();
        let p95 = p95_ms(&mut samples);
        assert!((p95 - 95.0).abs() < 0.001, "p95 was {p95}");
    }

    #[test]
    fn test_p95_of_small_sets() {
        assert!((p95_ms(&mut []) - 0.0).abs() < f64::EPSILON);
        let mut one = vec![Duration::from_millis(42)];
        assert!((p95_ms(&mut one) - 42.0).abs() < 0.001);
    }

    #[test]
    fn test_classify_maps_breaches_to_statuses() {
        let threshold = Threshold::new(500.0, 1000.0);
        let started = Instant::now();

        let pass = classify("x".into(), started, threshold, 100.0, String::new());
        assert_eq!(pass.status, harness::CheckStatus::Pass);

        let warn = classify("x".into(), started, threshold, 750.0, String::new());
        assert_eq!(warn.status, harness::CheckStatus::Conditional);
        assert_eq!(warn.score, 50);

        let fail = classify("x".into(), started, threshold, 1500.0, String::new());
        assert_eq!(fail.status, harness::CheckStatus::Fail);
        assert_eq!(fail.score, 0);
    }
}
