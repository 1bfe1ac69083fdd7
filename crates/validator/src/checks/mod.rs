//! The check inventory.
//!
//! A check is one named validation producing one [`CheckResult`]. Checks
//! never abort the run: transport errors are retried and then demoted to a
//! recorded FAIL, and every check runs under the per-check timeout so a hung
//! endpoint becomes a FAIL instead of a stuck run.

pub mod integration;
pub mod performance;
pub mod production;
pub mod security;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use harness::{CheckResult, RetryConfig, RunPolicy, Suite};

use crate::clients::{PrometheusClient, ServiceClient, VaultClient};
use crate::cluster::resolver::TargetEndpoints;
use crate::cluster::ClusterClient;
use crate::fixtures::FixtureTracker;

/// Everything a check may need, assembled once per run.
pub struct CheckContext {
    pub cluster: ClusterClient,
    pub endpoints: TargetEndpoints,
    pub policy: RunPolicy,
    /// Budget for one whole check, including its retries.
    pub check_timeout: Duration,
    /// Retry policy for network-facing calls inside a check.
    pub retry: RetryConfig,
    /// Timeout for a single HTTP request within a check.
    pub http_timeout: Duration,
    /// `None` when VAULT_ADDR/VAULT_TOKEN are unset; Vault checks skip.
    pub vault: Option<VaultClient>,
    pub prometheus: PrometheusClient,
    pub fixtures: Arc<FixtureTracker>,
}

impl CheckContext {
    /// HTTP client for one platform service, or `None` when the resolver
    /// found no endpoint for it.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn service_client(&self, name: &str) -> Result<Option<ServiceClient>> {
        match self.endpoints.url_for(name) {
            Some(url) => Ok(Some(ServiceClient::new(url, self.http_timeout)?)),
            None => Ok(None),
        }
    }
}

/// One named validation.
#[async_trait]
pub trait Check: Send + Sync {
    /// Stable identifier, e.g. `health-temperature-service`.
    fn name(&self) -> String;

    /// Suite the check reports under.
    fn suite(&self) -> Suite;

    /// Execute the check. Must return a result rather than propagate errors;
    /// anything unexpected becomes a FAIL with the error in the details.
    async fn run(&self, ctx: &CheckContext) -> CheckResult;
}

/// Run one check under the per-check timeout.
///
/// A timeout is recorded as a FAIL with score 0; a timed-out check can never
/// go missing from the run.
pub async fn execute(check: &dyn Check, ctx: &CheckContext) -> CheckResult {
    match tokio::time::timeout(ctx.check_timeout, check.run(ctx)).await {
        Ok(result) => result,
        Err(_) => CheckResult::fail_timeout(check.name(), check.suite(), ctx.check_timeout),
    }
}

/// The full inventory for one suite, in execution order.
#[must_use]
pub fn checks_for(suite: Suite) -> Vec<Box<dyn Check>> {
    match suite {
        Suite::Production => production::checks(),
        Suite::Security => security::checks(),
        Suite::Performance => performance::checks(),
        Suite::Integration => integration::checks(),
    }
}

/// Milliseconds elapsed since `started`, saturating.
pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Turn a check-internal error into a recorded FAIL.
pub(crate) fn fail_from_error(
    name: &str,
    suite: Suite,
    started: Instant,
    err: &anyhow::Error,
) -> CheckResult {
    CheckResult::fail(name, suite, elapsed_ms(started), format!("{err:#}"))
}

/// FAIL for a service the resolver produced no endpoint for.
pub(crate) fn fail_unresolved(name: &str, suite: Suite, service_name: &str) -> CheckResult {
    CheckResult::fail(
        name,
        suite,
        0,
        format!("no resolved endpoint for {service_name}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_suites_are_consistent() {
        for suite in Suite::all() {
            let checks = checks_for(suite);
            assert!(!checks.is_empty(), "{suite} suite has no checks");
            for check in &checks {
                assert_eq!(check.suite(), suite, "{} reports the wrong suite", check.name());
                assert!(!check.name().is_empty());
            }
        }
    }

    #[test]
    fn test_inventory_names_are_unique() {
        let mut names = std::collections::BTreeSet::new();
        for suite in Suite::all() {
            for check in checks_for(suite) {
                assert!(names.insert(check.name()), "duplicate check {}", check.name());
            }
        }
    }

    #[test]
    fn test_production_covers_every_probed_service() {
        let names: Vec<String> = checks_for(Suite::Production)
            .iter()
            .map(|c| c.name())
            .collect();
        for service in crate::config::SERVICES {
            assert!(
                names.contains(&format!("health-{}", service.name)),
                "missing health check for {}",
                service.name
            );
        }
    }
}
