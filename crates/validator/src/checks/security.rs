//! Security audit checks.
//!
//! Network posture and identity checks read cluster state; the Vault checks
//! exercise the transit engine the platform encrypts temperature payloads
//! with. Vault checks record themselves as skipped when no Vault address and
//! token are configured, so the suite stays runnable against clusters
//! without a reachable Vault.

use std::time::Instant;

use async_trait::async_trait;
use harness::{with_retry, CheckResult, Suite};
use k8s_openapi::api::networking::v1::NetworkPolicy;

use super::{elapsed_ms, fail_from_error, Check, CheckContext};
use crate::config::SERVICES;

const SUITE: Suite = Suite::Security;

/// Transit key the platform encrypts payloads with.
pub const TRANSIT_KEY: &str = "grill-stats";

/// Deterministic probe payload for the transit round-trip.
pub const TRANSIT_PROBE: &[u8] = b"grill-stats transit probe";

/// Secret names the platform manifests reference.
pub const EXPECTED_SECRETS: &[&str] = &[
    "grill-stats-secrets",
    "database-credentials",
    "thermoworks-api-key",
];

/// The security suite.
#[must_use]
pub fn checks() -> Vec<Box<dyn Check>> {
    vec![
        Box::new(NetworkPolicies),
        Box::new(ServiceAccounts),
        Box::new(SecretsPresent),
        Box::new(VaultTransit),
        Box::new(VaultKeyRotation),
        Box::new(TlsIngress),
    ]
}

/// A default-deny policy exists and every service is selected by a policy.
struct NetworkPolicies;

#[async_trait]
impl Check for NetworkPolicies {
    fn name(&self) -> String {
        "network-policies".into()
    }

    fn suite(&self) -> Suite {
        SUITE
    }

    async fn run(&self, ctx: &CheckContext) -> CheckResult {
        let started = Instant::now();
        let policies = match ctx.cluster.network_policies().await {
            Ok(policies) => policies,
            Err(e) => return fail_from_error(&self.name(), SUITE, started, &e),
        };

        let has_default_deny = policies.iter().any(is_default_deny);
        let uncovered: Vec<&str> = SERVICES
            .iter()
            .map(|s| s.name)
            .filter(|name| !policies.iter().any(|p| selects_service(p, name)))
            .collect();

        match (has_default_deny, uncovered.is_empty()) {
            (true, true) => CheckResult::pass(
                self.name(),
                SUITE,
                elapsed_ms(started),
                format!("default-deny present, {} policies cover all services", policies.len()),
            ),
            (true, false) => CheckResult::conditional(
                self.name(),
                SUITE,
                elapsed_ms(started),
                format!("default-deny present but uncovered: {}", uncovered.join(", ")),
            ),
            (false, _) => CheckResult::fail(
                self.name(),
                SUITE,
                elapsed_ms(started),
                "no default-deny NetworkPolicy in namespace",
            ),
        }
    }
}

/// An empty pod selector with ingress restricted and no allow rules.
fn is_default_deny(policy: &NetworkPolicy) -> bool {
    let Some(spec) = policy.spec.as_ref() else {
        return false;
    };
    let selector_empty = spec
        .pod_selector
        .match_labels
        .as_ref()
        .is_none_or(std::collections::BTreeMap::is_empty)
        && spec
            .pod_selector
            .match_expressions
            .as_ref()
            .is_none_or(Vec::is_empty);
    let denies_ingress = spec
        .policy_types
        .as_ref()
        .is_some_and(|types| types.iter().any(|t| t == "Ingress"))
        && spec.ingress.as_ref().is_none_or(Vec::is_empty);
    selector_empty && denies_ingress
}

/// Whether a policy's pod selector matches the service's `app` label (an
/// empty selector selects everything).
fn selects_service(policy: &NetworkPolicy, service: &str) -> bool {
    let Some(spec) = policy.spec.as_ref() else {
        return false;
    };
    match spec.pod_selector.match_labels.as_ref() {
        None => true,
        Some(labels) if labels.is_empty() => true,
        Some(labels) => labels.get("app").is_some_and(|app| app == service),
    }
}

/// Expected deployments run under dedicated, existing ServiceAccounts.
struct ServiceAccounts;

#[async_trait]
impl Check for ServiceAccounts {
    fn name(&self) -> String {
        "service-accounts".into()
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
        let accounts = match ctx.cluster.service_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => return fail_from_error(&self.name(), SUITE, started, &e),
        };

        let mut problems = Vec::new();
        for service in SERVICES {
            let Some(deployment) = deployments
                .iter()
                .find(|d| d.metadata.name.as_deref() == Some(service.name))
            else {
                continue; // deployments-ready reports missing deployments
            };

            let sa_name = deployment
                .spec
                .as_ref()
                .and_then(|s| s.template.spec.as_ref())
                .and_then(|s| s.service_account_name.as_deref());
            match sa_name {
                None | Some("default") => {
                    problems.push(format!("{} runs as default SA", service.name));
                }
                Some(sa) => {
                    let exists = accounts
                        .iter()
                        .any(|a| a.metadata.name.as_deref() == Some(sa));
                    if !exists {
                        problems.push(format!("{} references missing SA {sa}", service.name));
                    }
                }
            }
        }

        if problems.is_empty() {
            CheckResult::pass(
                self.name(),
                SUITE,
                elapsed_ms(started),
                "all deployments use dedicated ServiceAccounts",
            )
        } else {
            CheckResult::fail(self.name(), SUITE, elapsed_ms(started), problems.join("; "))
        }
    }
}

/// The secrets the manifests reference exist in the namespace.
struct SecretsPresent;

#[async_trait]
impl Check for SecretsPresent {
    fn name(&self) -> String {
        "secrets-present".into()
    }

    fn suite(&self) -> Suite {
        SUITE
    }

    async fn run(&self, ctx: &CheckContext) -> CheckResult {
        let started = Instant::now();
        let secrets = match ctx.cluster.secrets().await {
            Ok(secrets) => secrets,
            Err(e) => return fail_from_error(&self.name(), SUITE, started, &e),
        };

        let missing: Vec<&str> = EXPECTED_SECRETS
            .iter()
            .copied()
            .filter(|expected| {
                !secrets
                    .iter()
                    .any(|s| s.metadata.name.as_deref() == Some(*expected))
            })
            .collect();

        if missing.is_empty() {
            CheckResult::pass(
                self.name(),
                SUITE,
                elapsed_ms(started),
                format!("{} expected secrets present", EXPECTED_SECRETS.len()),
            )
        } else {
            CheckResult::fail(
                self.name(),
                SUITE,
                elapsed_ms(started),
                format!("missing secrets: {}", missing.join(", ")),
            )
        }
    }
}

/// Transit engine round-trip: encrypt a probe, decrypt it, compare.
struct VaultTransit;

#[async_trait]
impl Check for VaultTransit {
    fn name(&self) -> String {
        "vault-transit".into()
    }

    fn suite(&self) -> Suite {
        SUITE
    }

    async fn run(&self, ctx: &CheckContext) -> CheckResult {
        let name = self.name();
        let Some(vault) = ctx.vault.as_ref() else {
            return CheckResult::skip(name, SUITE, "VAULT_ADDR/VAULT_TOKEN not set");
        };

        let started = Instant::now();
        let roundtrip = with_retry(ctx.retry, &name, || async {
            let ciphertext = vault.transit_encrypt(TRANSIT_KEY, TRANSIT_PROBE).await?;
            let plaintext = vault.transit_decrypt(TRANSIT_KEY, &ciphertext).await?;
            Ok(plaintext)
        })
        .await;

        match roundtrip {
            Ok(plaintext) if plaintext == TRANSIT_PROBE => CheckResult::pass(
                name,
                SUITE,
                elapsed_ms(started),
                format!("transit round-trip ok via key {TRANSIT_KEY}"),
            ),
            Ok(_) => CheckResult::fail(
                name,
                SUITE,
                elapsed_ms(started),
                "decrypted payload does not match the probe",
            ),
            Err(e) => fail_from_error(&name, SUITE, started, &e),
        }
    }
}

/// The transit key is readable and rotates automatically. A key without an
/// automatic schedule is rotated by hand to prove rotation works at all;
/// old ciphertexts stay decryptable, so this does not disturb the platform.
struct VaultKeyRotation;

#[async_trait]
impl Check for VaultKeyRotation {
    fn name(&self) -> String {
        "vault-key-rotation".into()
    }

    fn suite(&self) -> Suite {
        SUITE
    }

    async fn run(&self, ctx: &CheckContext) -> CheckResult {
        let name = self.name();
        let Some(vault) = ctx.vault.as_ref() else {
            return CheckResult::skip(name, SUITE, "VAULT_ADDR/VAULT_TOKEN not set");
        };

        let started = Instant::now();
        let info = with_retry(ctx.retry, &name, || vault.transit_key_info(TRANSIT_KEY)).await;

        match info {
            Ok(info) if info.auto_rotate_period_secs > 0 => CheckResult::pass(
                name,
                SUITE,
                elapsed_ms(started),
                format!(
                    "key v{} rotates every {}s",
                    info.latest_version, info.auto_rotate_period_secs
                ),
            ),
            Ok(_) => match vault.transit_rotate(TRANSIT_KEY).await {
                Ok(Some(version)) => CheckResult::conditional(
                    name,
                    SUITE,
                    elapsed_ms(started),
                    format!("auto-rotation disabled; manually rotated to v{version}"),
                ),
                Ok(None) => CheckResult::conditional(
                    name,
                    SUITE,
                    elapsed_ms(started),
                    "auto-rotation disabled; manual rotation accepted",
                ),
                Err(e) => fail_from_error(&name, SUITE, started, &e),
            },
            Err(e) => fail_from_error(&name, SUITE, started, &e),
        }
    }
}

/// When the run resolved via ingress, the ingress must carry TLS.
struct TlsIngress;

#[async_trait]
impl Check for TlsIngress {
    fn name(&self) -> String {
        "tls-ingress".into()
    }

    fn suite(&self) -> Suite {
        SUITE
    }

    async fn run(&self, ctx: &CheckContext) -> CheckResult {
        let name = self.name();
        if ctx.endpoints.external_url().is_none() {
            return CheckResult::skip(name, SUITE, "resolved via port-forward, no ingress host");
        }

        let started = Instant::now();
        let ingresses = match ctx.cluster.ingresses().await {
            Ok(ingresses) => ingresses,
            Err(e) => return fail_from_error(&name, SUITE, started, &e),
        };

        let has_tls = ingresses.iter().any(|ingress| {
            ingress
                .spec
                .as_ref()
                .and_then(|s| s.tls.as_ref())
                .is_some_and(|tls| !tls.is_empty())
        });

        if has_tls {
            CheckResult::pass(name, SUITE, elapsed_ms(started), "ingress carries TLS")
        } else {
            CheckResult::fail(
                name,
                SUITE,
                elapsed_ms(started),
                "ingress host published without a TLS section",
            )
        }
    }
}
