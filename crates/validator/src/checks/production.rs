//! Production readiness checks.
//!
//! Cluster-state checks go through the Kubernetes API; health and readiness
//! probes go through the resolved service endpoints.

use std::time::Instant;

use async_trait::async_trait;
use harness::{with_retry, CheckResult, Suite};
use k8s_openapi::api::core::v1::Pod;

use super::{elapsed_ms, fail_from_error, fail_unresolved, Check, CheckContext};
use crate::config::{ServiceSpec, SERVICES};

const SUITE: Suite = Suite::Production;

/// The production suite, cluster-state checks first, probes after.
#[must_use]
pub fn checks() -> Vec<Box<dyn Check>> {
    let mut checks: Vec<Box<dyn Check>> = vec![
        Box::new(PodsRunning),
        Box::new(DeploymentsReady),
        Box::new(ServicesPublished),
        Box::new(BackupCronJob),
    ];
    for service in SERVICES {
        checks.push(Box::new(HealthCheck { service }));
    }
    for service in SERVICES {
        checks.push(Box::new(ReadinessCheck { service }));
    }
    checks
}

/// Every pod in the namespace is Running (and Ready) or Succeeded.
struct PodsRunning;

#[async_trait]
impl Check for PodsRunning {
    fn name(&self) -> String {
        "pods-running".into()
    }

    fn suite(&self) -> Suite {
        SUITE
    }

    async fn run(&self, ctx: &CheckContext) -> CheckResult {
        let started = Instant::now();
        let pods = match ctx.cluster.pods().await {
            Ok(pods) => pods,
            Err(e) => return fail_from_error(&self.name(), SUITE, started, &e),
        };

        if pods.is_empty() {
            return CheckResult::fail(
                self.name(),
                SUITE,
                elapsed_ms(started),
                format!("no pods found in namespace {}", ctx.cluster.namespace()),
            );
        }

        let total = pods.len();
        let unhealthy: Vec<String> = pods.iter().filter(|p| !pod_healthy(p)).map(pod_name).collect();

        if unhealthy.is_empty() {
            CheckResult::pass(
                self.name(),
                SUITE,
                elapsed_ms(started),
                format!("{total}/{total} pods ready"),
            )
        } else {
            CheckResult::fail(
                self.name(),
                SUITE,
                elapsed_ms(started),
                format!(
                    "{}/{total} pods not ready: {}",
                    unhealthy.len(),
                    unhealthy.join(", ")
                ),
            )
        }
    }
}

fn pod_name(pod: &Pod) -> String {
    pod.metadata.name.clone().unwrap_or_else(|| "(unnamed)".into())
}

fn pod_healthy(pod: &Pod) -> bool {
    let Some(status) = pod.status.as_ref() else {
        return false;
    };
    match status.phase.as_deref() {
        Some("Succeeded") => true,
        Some("Running") => status
            .conditions
            .as_ref()
            .is_some_and(|conditions| {
                conditions
                    .iter()
                    .any(|c| c.type_ == "Ready" && c.status == "True")
            }),
        _ => false,
    }
}

/// Every expected deployment has all its replicas ready.
struct DeploymentsReady;

#[async_trait]
impl Check for DeploymentsReady {
    fn name(&self) -> String {
        "deployments-ready".into()
    }

    fn suite(&self) -> Suite {
        SUITE
    }

    async fn run(&self, ctx: &CheckContext) -> CheckResult {
        let started = Instant::now();
        let deployments = match ctx.cluster.deployments().await {
            Ok(deployments) => deployments,
            Err(e) => return fail_from_error(&self.name(), SUITE, started, &e),
        };

        let mut problems = Vec::new();
        for service in SERVICES {
            let Some(deployment) = deployments
                .iter()
                .find(|d| d.metadata.name.as_deref() == Some(service.name))
            else {
                problems.push(format!("{} missing", service.name));
                continue;
            };

            let wanted = deployment
                .spec
                .as_ref()
                .and_then(|s| s.replicas)
                .unwrap_or(1);
            let ready = deployment
                .status
                .as_ref()
                .and_then(|s| s.ready_replicas)
                .unwrap_or(0);
            if ready < wanted {
                problems.push(format!("{} {ready}/{wanted} ready", service.name));
            }
        }

        if problems.is_empty() {
            CheckResult::pass(
                self.name(),
                SUITE,
                elapsed_ms(started),
                format!("{} deployments fully ready", SERVICES.len()),
            )
        } else {
            CheckResult::fail(self.name(), SUITE, elapsed_ms(started), problems.join("; "))
        }
    }
}

/// Every expected Service exists and exposes its configured port.
struct ServicesPublished;

#[async_trait]
impl Check for ServicesPublished {
    fn name(&self) -> String {
        "services-published".into()
    }

    fn suite(&self) -> Suite {
        SUITE
    }

    async fn run(&self, ctx: &CheckContext) -> CheckResult {
        let started = Instant::now();
        let services = match ctx.cluster.services().await {
            Ok(services) => services,
            Err(e) => return fail_from_error(&self.name(), SUITE, started, &e),
        };

        let mut problems = Vec::new();
        for expected in SERVICES {
            let Some(found) = services
                .iter()
                .find(|s| s.metadata.name.as_deref() == Some(expected.name))
            else {
                problems.push(format!("{} missing", expected.name));
                continue;
            };

            let has_port = found
                .spec
                .as_ref()
                .and_then(|s| s.ports.as_ref())
                .is_some_and(|ports| ports.iter().any(|p| p.port == i32::from(expected.port)));
            if !has_port {
                problems.push(format!("{} missing port {}", expected.name, expected.port));
            }
        }

        if problems.is_empty() {
            CheckResult::pass(
                self.name(),
                SUITE,
                elapsed_ms(started),
                format!("{} services published", SERVICES.len()),
            )
        } else {
            CheckResult::fail(self.name(), SUITE, elapsed_ms(started), problems.join("; "))
        }
    }
}

/// A backup CronJob exists and is not suspended.
struct BackupCronJob;

#[async_trait]
impl Check for BackupCronJob {
    fn name(&self) -> String {
        "backup-cronjob".into()
    }

    fn suite(&self) -> Suite {
        SUITE
    }

    async fn run(&self, ctx: &CheckContext) -> CheckResult {
        let started = Instant::now();
        let cron_jobs = match ctx.cluster.cron_jobs().await {
            Ok(jobs) => jobs,
            Err(e) => return fail_from_error(&self.name(), SUITE, started, &e),
        };

        let Some(backup) = cron_jobs.iter().find(|job| {
            job.metadata
                .name
                .as_deref()
                .is_some_and(|name| name.contains("backup"))
        }) else {
            return CheckResult::fail(
                self.name(),
                SUITE,
                elapsed_ms(started),
                "no backup CronJob found",
            );
        };

        let name = backup.metadata.name.as_deref().unwrap_or("backup");
        let suspended = backup
            .spec
            .as_ref()
            .and_then(|s| s.suspend)
            .unwrap_or(false);
        if suspended {
            CheckResult::fail(
                self.name(),
                SUITE,
                elapsed_ms(started),
                format!("CronJob {name} is suspended"),
            )
        } else {
            CheckResult::pass(
                self.name(),
                SUITE,
                elapsed_ms(started),
                format!("CronJob {name} active"),
            )
        }
    }
}

/// `GET /health` answers 200 for one service.
struct HealthCheck {
    service: &'static ServiceSpec,
}

#[async_trait]
impl Check for HealthCheck {
    fn name(&self) -> String {
        format!("health-{}", self.service.name)
    }

    fn suite(&self) -> Suite {
        SUITE
    }

    async fn run(&self, ctx: &CheckContext) -> CheckResult {
        let name = self.name();
        let started = Instant::now();

        let client = match ctx.service_client(self.service.name) {
            Ok(Some(client)) => client,
            Ok(None) => return fail_unresolved(&name, SUITE, self.service.name),
            Err(e) => return fail_from_error(&name, SUITE, started, &e),
        };

        let path = self.service.route("/health");
        let outcome = with_retry(ctx.retry, &name, || client.get_status(&path)).await;

        match outcome {
            Ok((status, latency)) if status.as_u16() == 200 => CheckResult::pass(
                name,
                SUITE,
                elapsed_ms(started),
                format!("200 in {} ms", latency.as_millis()),
            ),
            Ok((status, _)) => CheckResult::fail(
                name,
                SUITE,
                elapsed_ms(started),
                format!("GET {path} returned {status}"),
            ),
            Err(e) => fail_from_error(&name, SUITE, started, &e),
        }
    }
}

/// `GET /ready` answers 200 for one service. The web UI ships no readiness
/// probe and records a skip instead.
struct ReadinessCheck {
    service: &'static ServiceSpec,
}

#[async_trait]
impl Check for ReadinessCheck {
    fn name(&self) -> String {
        format!("readiness-{}", self.service.name)
    }

    fn suite(&self) -> Suite {
        SUITE
    }

    async fn run(&self, ctx: &CheckContext) -> CheckResult {
        let name = self.name();
        if !self.service.probes {
            return CheckResult::skip(
                name,
                SUITE,
                format!("{} exposes no readiness probe", self.service.name),
            );
        }

        let started = Instant::now();
        let client = match ctx.service_client(self.service.name) {
            Ok(Some(client)) => client,
            Ok(None) => return fail_unresolved(&name, SUITE, self.service.name),
            Err(e) => return fail_from_error(&name, SUITE, started, &e),
        };

        let path = self.service.route("/ready");
        let outcome = with_retry(ctx.retry, &name, || client.get_status(&path)).await;

        match outcome {
            Ok((status, _)) if status.as_u16() == 200 => CheckResult::pass(
                name,
                SUITE,
                elapsed_ms(started),
                "ready",
            ),
            Ok((status, _)) => CheckResult::fail(
                name,
                SUITE,
                elapsed_ms(started),
                format!("GET {path} returned {status}"),
            ),
            Err(e) => fail_from_error(&name, SUITE, started, &e),
        }
    }
}
