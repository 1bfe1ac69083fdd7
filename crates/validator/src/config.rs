//! Validator configuration: the service inventory and the knobs a run is
//! shaped by.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use harness::{RunPolicy, Suite};

/// A platform service the validator knows how to reach.
#[derive(Debug, Clone, Copy)]
pub struct ServiceSpec {
    /// Kubernetes Service name.
    pub name: &'static str,
    /// Service port inside the cluster.
    pub port: u16,
    /// Path prefix the ingress routes to this service. Services mount their
    /// routes under the same prefix, so the path is identical whether the
    /// request goes through the ingress or a port-forward tunnel.
    pub prefix: &'static str,
    /// Whether the service exposes `/health` and `/ready` probes.
    pub probes: bool,
}

impl ServiceSpec {
    /// Full request path for an endpoint under this service's prefix.
    #[must_use]
    pub fn route(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path)
    }
}

/// The Grill Stats service inventory, in health-check order.
pub const SERVICES: &[ServiceSpec] = &[
    ServiceSpec {
        name: "auth-service",
        port: 8082,
        prefix: "/api/auth",
        probes: true,
    },
    ServiceSpec {
        name: "device-service",
        port: 8080,
        prefix: "/api/devices",
        probes: true,
    },
    ServiceSpec {
        name: "temperature-service",
        port: 8081,
        prefix: "/api/temperature",
        probes: true,
    },
    ServiceSpec {
        name: "historical-data-service",
        port: 8083,
        prefix: "/api/history",
        probes: true,
    },
    ServiceSpec {
        name: "encryption-service",
        port: 8084,
        prefix: "/api/encryption",
        probes: true,
    },
    ServiceSpec {
        name: "web-ui",
        port: 3000,
        prefix: "",
        probes: false,
    },
];

/// Look up a service by name.
#[must_use]
pub fn service(name: &str) -> Option<&'static ServiceSpec> {
    SERVICES.iter().find(|s| s.name == name)
}

/// Which suites a run executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteSelection {
    suites: Vec<Suite>,
}

impl SuiteSelection {
    /// Every suite, integration last.
    #[must_use]
    pub fn all() -> Self {
        Self {
            suites: Suite::all().to_vec(),
        }
    }

    /// A single suite.
    #[must_use]
    pub fn single(suite: Suite) -> Self {
        Self {
            suites: vec![suite],
        }
    }

    #[must_use]
    pub fn suites(&self) -> &[Suite] {
        &self.suites
    }

    /// Suites safe to run concurrently. Integration checks mutate platform
    /// state through fixtures and always run on their own afterwards.
    #[must_use]
    pub fn concurrent_group(&self) -> Vec<Suite> {
        self.suites
            .iter()
            .copied()
            .filter(|s| *s != Suite::Integration)
            .collect()
    }

    #[must_use]
    pub fn includes_integration(&self) -> bool {
        self.suites.contains(&Suite::Integration)
    }

    /// Whether more than one suite runs, which switches the verdict to the
    /// aggregate score floor.
    #[must_use]
    pub fn is_full_run(&self) -> bool {
        self.suites.len() > 1
    }

    #[must_use]
    pub fn describe(&self) -> String {
        self.suites
            .iter()
            .map(Suite::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Skip-suite environment variable for a suite, honored so cron jobs can
/// disable a suite without editing the invocation.
#[must_use]
pub fn skip_env_var(suite: Suite) -> &'static str {
    match suite {
        Suite::Production => "SKIP_PRODUCTION",
        Suite::Security => "SKIP_SECURITY",
        Suite::Performance => "SKIP_PERFORMANCE",
        Suite::Integration => "SKIP_INTEGRATION",
    }
}

/// Why a suite is skipped, if its environment toggle is set.
#[must_use]
pub fn suite_skip_reason(suite: Suite) -> Option<String> {
    let var = skip_env_var(suite);
    match std::env::var(var) {
        Ok(value) if is_truthy(&value) => Some(format!("{var} set")),
        _ => None,
    }
}

/// Interpret the usual shell spellings of a boolean environment value.
#[must_use]
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Everything a validation run needs, assembled once from CLI flags, the
/// environment, and an optional policy file.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub namespace: String,
    pub cluster_context: Option<String>,
    pub selection: SuiteSelection,
    /// Per-check budget; a check that cannot finish inside it is failed.
    pub check_timeout: Duration,
    pub output_dir: PathBuf,
    pub parallel: bool,
    pub generate_report: bool,
    pub policy: RunPolicy,
}

impl ValidatorConfig {
    /// Load the policy file if one was given, otherwise use the built-in
    /// defaults.
    ///
    /// # Errors
    /// Returns an error if the policy file cannot be read or parsed.
    pub fn load_policy(path: Option<&PathBuf>) -> Result<RunPolicy> {
        match path {
            Some(path) => RunPolicy::load(path)
                .with_context(|| format!("Failed to load policy from {}", path.display())),
            None => Ok(RunPolicy::default()),
        }
    }

    /// Whether report artifacts are written, honoring the GENERATE_REPORT
    /// environment toggle (defaults to on).
    #[must_use]
    pub fn report_enabled(no_report_flag: bool) -> bool {
        if no_report_flag {
            return false;
        }
        match std::env::var("GENERATE_REPORT") {
            Ok(value) => is_truthy(&value),
            Err(_) => true,
        }
    }
}
