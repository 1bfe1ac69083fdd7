//! Integration checks.
//!
//! These exercise the platform end to end with real writes, so they always
//! run sequentially and only after the concurrent suites have joined. Every
//! created fixture is registered with the run's [`FixtureTracker`] before
//! any assertion runs against it, so run-end teardown removes it even when
//! the check fails half-way. Creates are never retried; a duplicate fixture
//! is worse than a recorded failure.

use std::time::Instant;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use harness::{CheckResult, Suite};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{elapsed_ms, fail_from_error, fail_unresolved, Check, CheckContext};
use crate::clients::ServiceClient;

const SUITE: Suite = Suite::Integration;

/// The integration suite, in dependency order.
#[must_use]
pub fn checks() -> Vec<Box<dyn Check>> {
    vec![
        Box::new(DeviceLifecycle),
        Box::new(AuthFlow),
        Box::new(TemperatureFlow),
        Box::new(EncryptionRoundtrip),
    ]
}

/// Short disposable suffix for fixture names.
fn probe_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Extract an `id` field that may be a string or a number.
fn extract_id(body: &Value) -> Option<String> {
    match body.get("id") {
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    }
}

/// Create a device, read it back, delete it.
struct DeviceLifecycle;

#[async_trait]
impl Check for DeviceLifecycle {
    fn name(&self) -> String {
        "device-lifecycle".into()
    }

    fn suite(&self) -> Suite {
        SUITE
    }

    async fn run(&self, ctx: &CheckContext) -> CheckResult {
        let name = self.name();
        let started = Instant::now();

        let client = match ctx.service_client("device-service") {
            Ok(Some(client)) => client,
            Ok(None) => return fail_unresolved(&name, SUITE, "device-service"),
            Err(e) => return fail_from_error(&name, SUITE, started, &e),
        };
        let Some(spec) = crate::config::service("device-service") else {
            return fail_unresolved(&name, SUITE, "device-service");
        };

        match device_lifecycle(ctx, &client, spec).await {
            Ok(details) => CheckResult::pass(name, SUITE, elapsed_ms(started), details),
            Err(e) => fail_from_error(&name, SUITE, started, &e),
        }
    }
}

async fn device_lifecycle(
    ctx: &CheckContext,
    client: &ServiceClient,
    spec: &crate::config::ServiceSpec,
) -> Result<String> {
    let device_name = format!("validation-probe-{}", probe_id());
    let payload = json!({ "name": device_name, "device_type": "thermometer" });

    let (status, body) = client.post_json(&spec.route(""), &payload).await?;
    anyhow::ensure!(status.is_success(), "device create returned {status}");
    let id = extract_id(&body).context("device create response carries no id")?;
    ctx.fixtures.track_device(&id);

    let (status, body) = client.get_json(&spec.route(&format!("/{id}"))).await?;
    anyhow::ensure!(status.is_success(), "device read-back returned {status}");
    let read_name = body.get("name").and_then(Value::as_str).unwrap_or_default();
    anyhow::ensure!(
        read_name == device_name,
        "read-back name '{read_name}' does not match '{device_name}'"
    );

    let status = client.delete(&spec.route(&format!("/{id}"))).await?;
    anyhow::ensure!(status.is_success(), "device delete returned {status}");
    ctx.fixtures.untrack_device(&id);

    Ok(format!("device {id} created, read, deleted"))
}

/// Register a test user, log in, make an authenticated call, delete the user.
struct AuthFlow;

#[async_trait]
impl Check for AuthFlow {
    fn name(&self) -> String {
        "auth-flow".into()
    }

    fn suite(&self) -> Suite {
        SUITE
    }

    async fn run(&self, ctx: &CheckContext) -> CheckResult {
        let name = self.name();
        let started = Instant::now();

        let client = match ctx.service_client("auth-service") {
            Ok(Some(client)) => client,
            Ok(None) => return fail_unresolved(&name, SUITE, "auth-service"),
            Err(e) => return fail_from_error(&name, SUITE, started, &e),
        };
        let Some(spec) = crate::config::service("auth-service") else {
            return fail_unresolved(&name, SUITE, "auth-service");
        };

        match auth_flow(ctx, &client, spec).await {
            Ok(details) => CheckResult::pass(name, SUITE, elapsed_ms(started), details),
            Err(e) => fail_from_error(&name, SUITE, started, &e),
        }
    }
}

async fn auth_flow(
    ctx: &CheckContext,
    client: &ServiceClient,
    spec: &crate::config::ServiceSpec,
) -> Result<String> {
    let suffix = probe_id();
    let email = format!("probe-{suffix}@grill-stats.local");
    let password = format!("Probe-{}!", Uuid::new_v4().simple());
    let credentials = json!({ "email": email, "password": password });

    let (status, body) = client.post_json(&spec.route("/register"), &credentials).await?;
    anyhow::ensure!(status.is_success(), "register returned {status}");
    let user_id = extract_id(&body).context("register response carries no id")?;
    ctx.fixtures.track_user(&user_id);

    let (status, body) = client.post_json(&spec.route("/login"), &credentials).await?;
    anyhow::ensure!(status.is_success(), "login returned {status}");
    let token = body
        .get("token")
        .and_then(Value::as_str)
        .context("login response carries no token")?
        .to_string();

    let (status, _) = client.get_json_bearer(&spec.route("/me"), &token).await?;
    anyhow::ensure!(status.is_success(), "authenticated probe returned {status}");

    let status = client.delete(&spec.route(&format!("/users/{user_id}"))).await?;
    anyhow::ensure!(status.is_success(), "user delete returned {status}");
    ctx.fixtures.untrack_user(&user_id);

    Ok(format!("user {user_id} registered, authenticated, deleted"))
}

/// Post a temperature reading and query it back through the historical API.
struct TemperatureFlow;

#[async_trait]
impl Check for TemperatureFlow {
    fn name(&self) -> String {
        "temperature-flow".into()
    }

    fn suite(&self) -> Suite {
        SUITE
    }

    async fn run(&self, ctx: &CheckContext) -> CheckResult {
        let name = self.name();
        let started = Instant::now();

        let temperature = match ctx.service_client("temperature-service") {
            Ok(Some(client)) => client,
            Ok(None) => return fail_unresolved(&name, SUITE, "temperature-service"),
            Err(e) => return fail_from_error(&name, SUITE, started, &e),
        };
        let historical = match ctx.service_client("historical-data-service") {
            Ok(Some(client)) => client,
            Ok(None) => return fail_unresolved(&name, SUITE, "historical-data-service"),
            Err(e) => return fail_from_error(&name, SUITE, started, &e),
        };
        let (Some(temp_spec), Some(hist_spec)) = (
            crate::config::service("temperature-service"),
            crate::config::service("historical-data-service"),
        ) else {
            return fail_unresolved(&name, SUITE, "temperature-service");
        };

        let device_id = format!("validation-probe-{}", probe_id());
        let reading = json!({
            "device_id": device_id,
            "temperature": 225.5,
            "unit": "celsius",
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let posted = temperature.post_json(&temp_spec.route("/readings"), &reading).await;
        match posted {
            Ok((status, _)) if status.is_success() => {}
            Ok((status, _)) => {
                return CheckResult::fail(
                    name,
                    SUITE,
                    elapsed_ms(started),
                    format!("reading write returned {status}"),
                )
            }
            Err(e) => return fail_from_error(&name, SUITE, started, &e),
        }

        let query = hist_spec.route(&format!("/readings?device_id={device_id}"));
        match historical.get_json(&query).await {
            Ok((status, body)) if status.is_success() => {
                let count = body
                    .get("readings")
                    .and_then(Value::as_array)
                    .map_or_else(|| body.as_array().map_or(0, Vec::len), Vec::len);
                if count > 0 {
                    CheckResult::pass(
                        name,
                        SUITE,
                        elapsed_ms(started),
                        format!("reading written and {count} returned for {device_id}"),
                    )
                } else {
                    // Ingest into the historical store is asynchronous.
                    CheckResult::conditional(
                        name,
                        SUITE,
                        elapsed_ms(started),
                        format!("reading written but not yet queryable for {device_id}"),
                    )
                }
            }
            Ok((status, _)) => CheckResult::fail(
                name,
                SUITE,
                elapsed_ms(started),
                format!("historical query returned {status}"),
            ),
            Err(e) => fail_from_error(&name, SUITE, started, &e),
        }
    }
}

/// Round-trip a payload through the encryption microservice's API. Distinct
/// from `vault-transit`, which talks to Vault directly.
struct EncryptionRoundtrip;

#[async_trait]
impl Check for EncryptionRoundtrip {
    fn name(&self) -> String {
        "encryption-roundtrip".into()
    }

    fn suite(&self) -> Suite {
        SUITE
    }

    async fn run(&self, ctx: &CheckContext) -> CheckResult {
        let name = self.name();
        let started = Instant::now();

        let client = match ctx.service_client("encryption-service") {
            Ok(Some(client)) => client,
            Ok(None) => return fail_unresolved(&name, SUITE, "encryption-service"),
            Err(e) => return fail_from_error(&name, SUITE, started, &e),
        };
        let Some(spec) = crate::config::service("encryption-service") else {
            return fail_unresolved(&name, SUITE, "encryption-service");
        };

        match encryption_roundtrip(&client, spec).await {
            Ok(details) => CheckResult::pass(name, SUITE, elapsed_ms(started), details),
            Err(e) => fail_from_error(&name, SUITE, started, &e),
        }
    }
}

async fn encryption_roundtrip(
    client: &ServiceClient,
    spec: &crate::config::ServiceSpec,
) -> Result<String> {
    let probe = format!("encryption probe {}", probe_id());
    let encoded = general_purpose::STANDARD.encode(&probe);

    let (status, body) = client
        .post_json(&spec.route("/encrypt"), &json!({ "plaintext": encoded }))
        .await?;
    anyhow::ensure!(status.is_success(), "encrypt returned {status}");
    let ciphertext = body
        .get("ciphertext")
        .and_then(Value::as_str)
        .context("encrypt response carries no ciphertext")?
        .to_string();

    let (status, body) = client
        .post_json(&spec.route("/decrypt"), &json!({ "ciphertext": ciphertext }))
        .await?;
    anyhow::ensure!(status.is_success(), "decrypt returned {status}");
    let plaintext = body
        .get("plaintext")
        .and_then(Value::as_str)
        .context("decrypt response carries no plaintext")?;
    anyhow::ensure!(plaintext == encoded, "decrypted payload does not match");

    Ok("encrypt/decrypt round-trip ok".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_ids_are_short_and_distinct() {
        let a = probe_id();
        let b = probe_id();
        assert_eq!(a.len(), 8);
        assert_ne!(a, b);
    }

    #[test]
    fn test_extract_id_handles_both_shapes() {
        assert_eq!(extract_id(&json!({"id": "abc"})).as_deref(), Some("abc"));
        assert_eq!(extract_id(&json!({"id": 42})).as_deref(), Some("42"));
        assert!(extract_id(&json!({"name": "x"})).is_none());
        assert!(extract_id(&json!({"id": null})).is_none());
    }

    #[test]
    fn test_suite_inventory_order() {
        let names: Vec<String> = checks().iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![
                "device-lifecycle",
                "auth-flow",
                "temperature-flow",
                "encryption-roundtrip"
            ]
        );
    }
}
