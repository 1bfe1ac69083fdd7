//! Target resolution.
//!
//! Prefers the ingress host; falls back to one port-forward tunnel per
//! service. A run only aborts when neither path yields a single reachable
//! endpoint.

use std::collections::BTreeMap;
use std::time::Duration;

use harness::Error;
use k8s_openapi::api::networking::v1::Ingress;
use tracing::{info, warn};

use crate::cluster::forward::PortForward;
use crate::cluster::ClusterClient;
use crate::config::SERVICES;
use crate::tooling;

/// Cheap, clonable snapshot of where every service can be reached.
#[derive(Debug, Clone, Default)]
pub struct TargetEndpoints {
    description: String,
    external_url: Option<String>,
    endpoints: BTreeMap<String, String>,
}

impl TargetEndpoints {
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            external_url: None,
            endpoints: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, service: impl Into<String>, base_url: impl Into<String>) {
        self.endpoints.insert(service.into(), base_url.into());
    }

    pub fn set_external(&mut self, url: impl Into<String>) {
        self.external_url = Some(url.into());
    }

    /// Base URL for one service, when it resolved.
    #[must_use]
    pub fn url_for(&self, service: &str) -> Option<&str> {
        self.endpoints.get(service).map(String::as_str)
    }

    /// The https ingress URL, when the cluster publishes one.
    #[must_use]
    pub fn external_url(&self) -> Option<&str> {
        self.external_url.as_deref()
    }

    /// One-line target description for the report header.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// A resolved target plus the tunnels that keep it reachable.
#[derive(Debug)]
pub struct ResolvedTarget {
    pub endpoints: TargetEndpoints,
    forwards: Vec<PortForward>,
}

impl ResolvedTarget {
    #[must_use]
    pub fn tunnel_count(&self) -> usize {
        self.forwards.len()
    }

    /// Tear down every tunnel. Endpoints are dead after this.
    pub async fn close(self) {
        for forward in self.forwards {
            forward.close().await;
        }
    }
}

/// Resolve a reachable base URL for every platform service.
///
/// A failed ingress lookup counts the same as no ingress published: the
/// resolver falls through to the port-forward path either way.
///
/// # Errors
/// Returns [`Error::ToolingMissing`] if the fallback needs kubectl and it is
/// absent, or [`Error::TargetUnreachable`] if neither the ingress host nor
/// any port-forward tunnel works.
pub async fn resolve(
    cluster: &ClusterClient,
    context: Option<&str>,
    probe_timeout: Duration,
) -> Result<ResolvedTarget, Error> {
    let ingresses = match cluster.ingresses().await {
        Ok(ingresses) => ingresses,
        Err(e) => {
            warn!(error = %e, "Cannot list ingresses, trying port-forward");
            Vec::new()
        }
    };

    if let Some(host) = first_ingress_host(&ingresses) {
        let base = format!("https://{host}");
        if probe(&base, probe_timeout).await {
            info!(host = %host, "Resolved target via ingress");

            let mut endpoints = TargetEndpoints::new(&base);
            endpoints.set_external(&base);
            for service in SERVICES {
                endpoints.insert(service.name, &base);
            }
            return Ok(ResolvedTarget {
                endpoints,
                forwards: Vec::new(),
            });
        }
        warn!(host = %host, "Ingress host did not answer, falling back to port-forward");
    } else {
        info!("No ingress host published, using port-forward");
    }

    tooling::ensure_kubectl()?;

    let mut endpoints = TargetEndpoints::new("");
    let mut forwards = Vec::new();
    let mut failures = Vec::new();

    for service in SERVICES {
        match PortForward::open(context, cluster.namespace(), service.name, service.port).await {
            Ok(forward) => {
                endpoints.insert(service.name, forward.local_url());
                forwards.push(forward);
            }
            Err(e) => {
                warn!(service = service.name, error = %e, "Port-forward failed");
                failures.push(format!("{}: {e:#}", service.name));
            }
        }
    }

    if forwards.is_empty() {
        return Err(Error::TargetUnreachable(format!(
            "no ingress host and no forwardable service ({})",
            failures.join("; ")
        )));
    }

    endpoints.description = format!("port-forward ({} tunnels)", forwards.len());
    info!(tunnels = forwards.len(), "Resolved target via port-forward");

    Ok(ResolvedTarget { endpoints, forwards })
}

/// First host published by any ingress rule.
#[must_use]
pub fn first_ingress_host(ingresses: &[Ingress]) -> Option<String> {
    ingresses
        .iter()
        .filter_map(|ingress| ingress.spec.as_ref())
        .filter_map(|spec| spec.rules.as_ref())
        .flatten()
        .filter_map(|rule| rule.host.clone())
        .find(|host| !host.is_empty())
}

/// Whether the URL answers at all. Any HTTP response counts, only transport
/// failures (refused, DNS, TLS, timeout) do not.
async fn probe(url: &str, timeout: Duration) -> bool {
    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(_) => return false,
    };
    match client.get(url).send().await {
        Ok(_) => true,
        Err(e) => {
            warn!(url = %url, error = %e, "Target probe failed");
            false
        }
    }
}
