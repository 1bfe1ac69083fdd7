//! Run orchestration.
//!
//! Walks the run through its phases: resolve a reachable target, execute the
//! selected suites (concurrent group first, integration strictly after),
//! join the collector, emit reports, and map the verdict to an exit code.
//! Fixture teardown and tunnel close run on every path out, including an
//! interrupt.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use harness::{
    spawn_collector, CheckResult, Error, ResultSender, RetryConfig, RunPhase, Suite,
    ValidationRun, VerdictScope,
};
use tracing::{error, info, warn};

use crate::checks::{self, CheckContext};
use crate::clients::{PrometheusClient, PrometheusConfig, VaultClient};
use crate::cluster::{resolver, ClusterClient};
use crate::config::{self, ValidatorConfig};
use crate::fixtures::FixtureTracker;
use crate::tooling;
use crate::ui;

/// Timeout for a single HTTP request inside a check.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Exit code for aborted and interrupted runs.
const EXIT_ABORT: i32 = 1;

/// Execute a full validation run and return the process exit code.
///
/// # Errors
/// Returns an error only for failures outside the run model, e.g. report
/// I/O. Aborts (unreachable target, missing tooling) are handled and mapped
/// to the abort exit code.
pub async fn run(config: ValidatorConfig) -> Result<i32> {
    let mut phase = RunPhase::NotStarted;
    advance(&mut phase); // ResolvingTarget

    // Taxonomy (c): a missing required CLI aborts before anything runs.
    if let Err(e) = tooling::ensure_kubectl() {
        return Ok(abort(phase, &e));
    }

    ui::print_step(&format!(
        "Resolving target for namespace {} ({})",
        config.namespace,
        config.cluster_context.as_deref().unwrap_or("default context")
    ));

    let cluster = match ClusterClient::connect(config.cluster_context.as_deref(), &config.namespace)
        .await
    {
        Ok(cluster) => cluster,
        Err(e) => {
            return Ok(abort(
                phase,
                &Error::TargetUnreachable(format!("cannot connect to cluster: {e:#}")),
            ));
        }
    };

    let resolved =
        match resolver::resolve(&cluster, config.cluster_context.as_deref(), HTTP_TIMEOUT).await {
            Ok(resolved) => resolved,
            Err(e) => return Ok(abort(phase, &e)),
        };
    ui::print_info(&format!(
        "Target: {} ({} endpoints)",
        resolved.endpoints.description(),
        resolved.endpoints.len()
    ));

    let mut validation_run =
        ValidationRun::new(config.cluster_context.clone(), &config.namespace);
    validation_run.target = resolved.endpoints.description().to_string();
    validation_run.set_flag("suites", config.selection.describe());
    validation_run.set_flag("parallel", config.parallel);
    validation_run.set_flag("check_timeout_secs", config.check_timeout.as_secs());

    let ctx = Arc::new(CheckContext {
        cluster,
        endpoints: resolved.endpoints.clone(),
        policy: config.policy.clone(),
        check_timeout: config.check_timeout,
        retry: RetryConfig::default(),
        http_timeout: HTTP_TIMEOUT,
        vault: VaultClient::from_env(HTTP_TIMEOUT).context("Failed to build Vault client")?,
        prometheus: PrometheusClient::new(PrometheusConfig::default())
            .context("Failed to build Prometheus client")?,
        fixtures: Arc::new(FixtureTracker::new()),
    });

    advance(&mut phase); // RunningChecks
    let (tx, collector) = spawn_collector(validation_run, true);

    // Suites disabled via the environment still show up in the report.
    let mut active: Vec<Suite> = Vec::new();
    for suite in config.selection.suites() {
        match config::suite_skip_reason(*suite) {
            Some(reason) => {
                let _ = tx.send(CheckResult::skip(format!("{suite}-suite"), *suite, reason));
            }
            None => active.push(*suite),
        }
    }

    let interrupted = {
        let checks_done = run_suites(&config, &active, Arc::clone(&ctx), tx.clone());
        tokio::pin!(checks_done);
        tokio::select! {
            () = &mut checks_done => false,
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupt received, running cleanup before exit");
                ui::print_warning("Interrupted - cleaning up fixtures and tunnels");
                true
            }
        }
    };

    // Cleanup runs on every path out: normal end, NO-GO, or interrupt.
    teardown_fixtures(&ctx).await;
    resolved.close().await;

    drop(ctx);
    drop(tx);
    let (validation_run, counts) = collector
        .await
        .context("Result collector task panicked")?;

    if interrupted {
        return Ok(EXIT_ABORT);
    }

    advance(&mut phase); // Aggregating
    let scope = if config.selection.is_full_run() {
        VerdictScope::Full
    } else {
        config
            .selection
            .suites()
            .first()
            .map_or(VerdictScope::Full, |suite| VerdictScope::Suite(*suite))
    };
    let summary = validation_run.summarize(&config.policy.verdict, scope);

    advance(&mut phase); // Reporting
    if config.generate_report {
        let paths = harness::write_reports(&config.output_dir, &validation_run, &summary)
            .context("Failed to write report artifacts")?;
        ui::print_report_paths(&paths);
    }

    advance(&mut phase); // Done
    ui::print_section("Validation Summary");
    ui::print_summary(&counts, summary.overall_score);
    ui::print_verdict(summary.verdict);
    info!(
        verdict = %summary.verdict,
        score = summary.overall_score,
        passed = counts.passed,
        failed = counts.failed,
        "Validation run complete"
    );

    Ok(summary.verdict.exit_code())
}

fn advance(phase: &mut RunPhase) {
    *phase = phase.next();
    info!(phase = %phase, "Entering phase");
}

/// Print the abort and produce the abort exit code.
fn abort(phase: RunPhase, err: &Error) -> i32 {
    debug_assert!(phase.can_abort());
    error!(phase = %phase, error = %err, "Run aborted");
    ui::print_error(&format!("Aborted while {phase}: {err}"));
    EXIT_ABORT
}

/// Run the concurrent group, then integration on its own.
async fn run_suites(
    config: &ValidatorConfig,
    active: &[Suite],
    ctx: Arc<CheckContext>,
    tx: ResultSender,
) {
    let group: Vec<Suite> = active
        .iter()
        .copied()
        .filter(|suite| *suite != Suite::Integration)
        .collect();

    if config.parallel && group.len() > 1 {
        // The set owns the suite tasks: dropping this future mid-run (the
        // interrupt path) cancels them, which releases their result senders.
        let mut tasks = tokio::task::JoinSet::new();
        for suite in group {
            let ctx = Arc::clone(&ctx);
            let tx = tx.clone();
            tasks.spawn(async move {
                run_suite(suite, &ctx, &tx).await;
            });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Suite task panicked");
            }
        }
    } else {
        for suite in group {
            run_suite(suite, &ctx, &tx).await;
        }
    }

    // Integration requires a quiet platform; it only starts once the
    // concurrent group has fully joined.
    if active.contains(&Suite::Integration) {
        run_suite(Suite::Integration, &ctx, &tx).await;
    }
}

async fn run_suite(suite: Suite, ctx: &CheckContext, tx: &ResultSender) {
    let checks = checks::checks_for(suite);
    ui::print_suite_header(suite, checks.len());
    for check in checks {
        let result = checks::execute(check.as_ref(), ctx).await;
        if tx.send(result).is_err() {
            // Collector gone; the run is shutting down.
            return;
        }
    }
}

/// Delete every fixture the integration checks left behind.
async fn teardown_fixtures(ctx: &CheckContext) {
    if ctx.fixtures.pending() == 0 {
        return;
    }

    let mut removed = 0;
    if let Some(spec) = config::service("device-service") {
        if let Ok(Some(client)) = ctx.service_client(spec.name) {
            removed += ctx.fixtures.cleanup_devices(&client, spec).await;
        }
    }
    if let Some(spec) = config::service("auth-service") {
        if let Ok(Some(client)) = ctx.service_client(spec.name) {
            removed += ctx.fixtures.cleanup_users(&client, spec).await;
        }
    }

    let left = ctx.fixtures.pending();
    if left > 0 {
        ui::print_warning(&format!("{left} fixtures could not be removed"));
    } else if removed > 0 {
        ui::print_success(&format!("Removed {removed} leftover fixtures"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::resolver::TargetEndpoints;
    use crate::config::SuiteSelection;
    use harness::{RunPolicy, ValidationRun};
    use std::path::PathBuf;

    /// Context whose cluster answers every request after a long delay, so
    /// suite tasks are parked mid-check.
    async fn stalled_context(server_url: &str) -> Arc<CheckContext> {
        let raw = format!(
            r#"
apiVersion: v1
kind: Config
clusters:
- name: stalled
  cluster:
    server: "{server_url}"
contexts:
- name: stalled
  context:
    cluster: stalled
    namespace: grill-stats
current-context: stalled
users: []
"#
        );
        let kubeconfig: kube::config::Kubeconfig = serde_yaml::from_str(&raw).unwrap();
        let kube_config = kube::Config::from_custom_kubeconfig(
            kubeconfig,
            &kube::config::KubeConfigOptions::default(),
        )
        .await
        .unwrap();
        let cluster =
            ClusterClient::new(kube::Client::try_from(kube_config).unwrap(), "grill-stats");

        Arc::new(CheckContext {
            cluster,
            endpoints: TargetEndpoints::new("test"),
            policy: RunPolicy::default(),
            check_timeout: Duration::from_secs(60),
            retry: RetryConfig::fixed(1, Duration::from_millis(1)),
            http_timeout: Duration::from_secs(60),
            vault: None,
            prometheus: PrometheusClient::new(crate::clients::PrometheusConfig {
                base_url: "http://127.0.0.1:1".to_string(),
                timeout: Duration::from_secs(1),
            })
            .unwrap(),
            fixtures: Arc::new(FixtureTracker::new()),
        })
    }

    #[tokio::test]
    async fn test_dropping_parallel_suites_releases_the_collector() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let ctx = stalled_context(&server.uri()).await;
        let config = ValidatorConfig {
            namespace: "grill-stats".to_string(),
            cluster_context: None,
            selection: SuiteSelection::all(),
            check_timeout: Duration::from_secs(60),
            output_dir: PathBuf::from("unused"),
            parallel: true,
            generate_report: false,
            policy: RunPolicy::default(),
        };

        let (tx, collector) = spawn_collector(ValidationRun::new(None, "grill-stats"), false);
        {
            let suites = run_suites(
                &config,
                &[Suite::Production, Suite::Security],
                Arc::clone(&ctx),
                tx.clone(),
            );
            tokio::pin!(suites);
            tokio::select! {
                () = &mut suites => panic!("suites cannot finish against a stalled cluster"),
                () = tokio::time::sleep(Duration::from_millis(250)) => {}
            }
        }

        drop(tx);
        drop(ctx);
        let joined = tokio::time::timeout(Duration::from_secs(5), collector).await;
        assert!(
            joined.is_ok(),
            "collector must not wait out cancelled suite tasks"
        );
    }

    #[test]
    fn test_abort_exit_code_and_phase_gate() {
        let code = abort(
            RunPhase::ResolvingTarget,
            &Error::TargetUnreachable("no ingress, no forwardable service".into()),
        );
        assert_eq!(code, EXIT_ABORT);

        let code = abort(
            RunPhase::RunningChecks,
            &Error::ToolingMissing {
                tool: "kubectl".into(),
                hint: "install it".into(),
            },
        );
        assert_eq!(code, EXIT_ABORT);
    }

    #[test]
    fn test_phase_advance_follows_lifecycle() {
        let mut phase = RunPhase::NotStarted;
        advance(&mut phase);
        assert_eq!(phase, RunPhase::ResolvingTarget);
        advance(&mut phase);
        assert_eq!(phase, RunPhase::RunningChecks);
    }
}
