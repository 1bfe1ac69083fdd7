//! Shared scaffolding for the wiremock-backed check tests.

use std::sync::Arc;
use std::time::Duration;

use grill_validator::checks::CheckContext;
use grill_validator::clients::{PrometheusClient, PrometheusConfig, VaultClient};
use grill_validator::cluster::resolver::TargetEndpoints;
use grill_validator::cluster::ClusterClient;
use grill_validator::config::SERVICES;
use grill_validator::fixtures::FixtureTracker;
use harness::{RetryConfig, RunPolicy};

/// A kube client aimed at `server_url`, built from an in-memory kubeconfig.
pub async fn mock_cluster(server_url: &str, namespace: &str) -> ClusterClient {
    let raw = format!(
        r#"
apiVersion: v1
kind: Config
clusters:
- name: mock
  cluster:
    server: "{server_url}"
contexts:
- name: mock
  context:
    cluster: mock
    namespace: {namespace}
current-context: mock
users: []
"#
    );
    let kubeconfig: kube::config::Kubeconfig = serde_yaml::from_str(&raw).unwrap();
    let config = kube::Config::from_custom_kubeconfig(
        kubeconfig,
        &kube::config::KubeConfigOptions::default(),
    )
    .await
    .unwrap();
    ClusterClient::new(kube::Client::try_from(config).unwrap(), namespace)
}

/// Options for building a test [`CheckContext`].
pub struct ContextOptions<'a> {
    /// Base URL every service endpoint resolves to.
    pub services_url: Option<&'a str>,
    /// Vault server URL; `None` leaves the Vault client unset.
    pub vault_url: Option<&'a str>,
    /// Prometheus URL; defaults to a dead port when unset.
    pub prometheus_url: Option<&'a str>,
    /// Per-check budget.
    pub check_timeout: Duration,
}

impl Default for ContextOptions<'_> {
    fn default() -> Self {
        Self {
            services_url: None,
            vault_url: None,
            prometheus_url: None,
            check_timeout: Duration::from_secs(5),
        }
    }
}

/// Assemble a context with fast retries and short timeouts. The cluster
/// client points at a dead port; checks under test here never touch the
/// Kubernetes API.
pub async fn check_context(options: ContextOptions<'_>) -> CheckContext {
    let mut endpoints = TargetEndpoints::new("test");
    if let Some(url) = options.services_url {
        for service in SERVICES {
            endpoints.insert(service.name, url);
        }
    }

    let vault = options
        .vault_url
        .map(|url| VaultClient::new(url, "test-token", Duration::from_secs(2)).unwrap());

    let prometheus = PrometheusClient::new(PrometheusConfig {
        base_url: options
            .prometheus_url
            .unwrap_or("http://127.0.0.1:1")
            .to_string(),
        timeout: Duration::from_secs(2),
    })
    .unwrap();

    CheckContext {
        cluster: mock_cluster("http://127.0.0.1:1", "grill-stats").await,
        endpoints,
        policy: RunPolicy::default(),
        check_timeout: options.check_timeout,
        retry: RetryConfig::fixed(2, Duration::from_millis(10)),
        http_timeout: Duration::from_secs(2),
        vault,
        prometheus,
        fixtures: Arc::new(FixtureTracker::new()),
    }
}

/// Find one check by name in a suite's inventory.
pub fn find_check(
    suite: harness::Suite,
    name: &str,
) -> Box<dyn grill_validator::checks::Check> {
    grill_validator::checks::checks_for(suite)
        .into_iter()
        .find(|c| c.name() == name)
        .unwrap_or_else(|| panic!("no check named {name}"))
}
